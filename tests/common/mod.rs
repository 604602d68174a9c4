#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use pdf_report_server::config::{ApiKeyProvider, StaticApiKeyProvider};
use pdf_report_server::report::{PdfReportBuilder, ReportBuilder, ReportError, ReportRequest};
use pdf_report_server::AppState;
use serde_json::{json, Value};

pub const API_KEY: &str = "test-api-key-0123456789";

/// App state writing into `dir`, authenticated with [`API_KEY`].
pub fn test_state(dir: &Path) -> AppState {
    state_with(Arc::new(StaticApiKeyProvider::new(API_KEY)), dir)
}

/// App state whose server has no API key configured.
pub fn unconfigured_state(dir: &Path) -> AppState {
    state_with(Arc::new(StaticApiKeyProvider::unset()), dir)
}

fn state_with(keys: Arc<dyn ApiKeyProvider + Send + Sync>, dir: &Path) -> AppState {
    AppState::new(
        keys,
        Arc::new(PdfReportBuilder::new().with_logo(dir.join("logo.png"))),
        dir,
    )
}

/// Builder that always fails, for exercising the 500 path.
pub struct FailingBuilder;

impl ReportBuilder for FailingBuilder {
    fn build(&self, _request: &ReportRequest, _output_path: &Path) -> Result<(), ReportError> {
        Err(ReportError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk on fire",
        )))
    }
}

pub fn failing_state(dir: &Path) -> AppState {
    AppState::new(
        Arc::new(StaticApiKeyProvider::new(API_KEY)),
        Arc::new(FailingBuilder),
        dir,
    )
}

pub fn alice_payload() -> Value {
    json!({
        "name": "Alice Example",
        "age": 30,
        "score1": 88.5,
        "score2": 92.0
    })
}

/// Names of regular files in `dir`, sorted.
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("output dir readable")
        .filter_map(Result::ok)
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
