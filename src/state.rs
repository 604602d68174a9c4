//! Shared application state handed to every handler.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{ApiKeyProvider, Settings};
use crate::report::{PdfReportBuilder, ReportBuilder};

#[derive(Clone)]
pub struct AppState {
    /// Consulted on every protected request; never cached.
    pub api_keys: Arc<dyn ApiKeyProvider + Send + Sync>,
    pub builder: Arc<dyn ReportBuilder + Send + Sync>,
    pub output_dir: PathBuf,
}

impl AppState {
    pub fn new(
        api_keys: Arc<dyn ApiKeyProvider + Send + Sync>,
        builder: Arc<dyn ReportBuilder + Send + Sync>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            api_keys,
            builder,
            output_dir: output_dir.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(settings.api_key_provider()),
            Arc::new(PdfReportBuilder::new().with_logo(settings.logo_path.clone())),
            settings.output_dir.clone(),
        )
    }
}
