use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A validated report request. Only [`validate_request`] builds these from
/// untrusted input.
///
/// [`validate_request`]: super::validation::validate_request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReportRequest {
    /// Subject name, stored trimmed.
    #[schema(example = "Alice Example")]
    pub name: String,
    #[schema(example = 30, minimum = 0, maximum = 150)]
    pub age: u32,
    #[schema(example = 88.5, minimum = 0.0)]
    pub score1: f64,
    #[schema(example = 92.0, minimum = 0.0)]
    pub score2: f64,
    /// Optional output filename ending with `.pdf`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "alice_report.pdf")]
    pub filename: Option<String>,
}

impl ReportRequest {
    pub fn total(&self) -> f64 {
        self.score1 + self.score2
    }

    pub fn average(&self) -> f64 {
        self.total() / 2.0
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerateReportResponse {
    pub success: bool,
    /// Server-side path of the generated file.
    pub file_path: String,
    pub download_url: String,
    pub total: f64,
    pub average: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InfoResponse {
    pub message: String,
    pub docs: String,
}
