//! Report generation: request model, validation, filename safety, rendering
//! and the HTTP endpoints that tie them together.

pub mod builder;
pub mod filename;
pub mod handlers;
pub mod model;
pub mod validation;

pub use builder::{PdfReportBuilder, ReportBuilder, ReportError};
pub use filename::sanitize_filename;
pub use handlers::{config, output_files, OUTPUT_URL_PREFIX};
pub use model::{GenerateReportResponse, InfoResponse, ReportRequest};
pub use validation::{validate_request, ValidationError, ValidationErrorKind, ValidationErrors};
