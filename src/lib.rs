use std::io;

use actix_cors::Cors;
use actix_web::http::header::{self, HeaderName};
use actix_web::middleware::Compress;
use actix_web::{web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ApiKeyProvider;

pub mod auth;
pub mod config;
pub mod error;
pub mod report;
pub mod state;

pub use crate::error::{ApiError, ErrorResponse};
pub use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PDF Generator API",
        description = "Accept JSON, validate, require X-API-KEY, generate PDF and save locally or return file."
    ),
    paths(
        crate::report::handlers::root,
        crate::report::handlers::generate_pdf,
        crate::report::handlers::download_pdf,
    ),
    components(
        schemas(
            report::model::ReportRequest,
            report::model::GenerateReportResponse,
            report::model::InfoResponse,
            report::validation::ValidationErrorBody,
            report::validation::ValidationErrorDetail,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Report Service", description = "PDF report generation endpoints.")
    )
)]
pub struct ApiDoc;

pub async fn run() -> io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = config::Settings::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    std::fs::create_dir_all(&settings.output_dir)?;
    if settings.api_key_provider().api_key().is_none() {
        log::warn!(
            "{} is not set; protected endpoints will fail until it is configured",
            settings.api_key_env
        );
    }

    let app_state = web::Data::new(AppState::from_settings(&settings));

    let prometheus = PrometheusMetricsBuilder::new("pdf_report_server")
        .endpoint("/metrics")
        .build()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    log::info!(
        "Starting server at http://{}:{} (output dir: {})",
        settings.host,
        settings.port,
        settings.output_dir.display()
    );

    let output_dir = settings.output_dir.clone();
    let cors_origins = settings.cors_allowed_origins.clone();

    HttpServer::new(move || {
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                header::ACCEPT,
                header::CONTENT_TYPE,
                HeaderName::from_static("x-api-key"),
            ])
            .max_age(3600);

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus.clone())
            .wrap(cors)
            .app_data(app_state.clone())
            .configure(report::config)
            .service(report::output_files(&output_dir))
            .service(SwaggerUi::new("/docs/{_:.*}").url("/api-doc/openapi.json", ApiDoc::openapi()))
    })
    .bind((settings.host.as_str(), settings.port))?
    .run()
    .await
}
