use std::path::{Path, PathBuf};

use actix_files::Files;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::{error, info};

use super::filename::sanitize_filename;
use super::model::{GenerateReportResponse, InfoResponse, ReportRequest};
use super::validation::{
    validate_request, ValidationError, ValidationErrorBody, ValidationErrorKind, ValidationErrors,
};
use crate::auth::validate_request_key;
use crate::error::{ApiError, ErrorResponse};
use crate::AppState;

/// URL prefix under which generated files are served.
pub const OUTPUT_URL_PREFIX: &str = "/output";

/// A report that has been written to disk.
struct GeneratedReport {
    request: ReportRequest,
    filename: String,
    output_path: PathBuf,
}

/// Shared pipeline: authorize, validate, sanitize, render.
async fn produce_report(
    req: &HttpRequest,
    state: &AppState,
    body: &[u8],
) -> Result<GeneratedReport, ApiError> {
    validate_request_key(req, state.api_keys.as_ref())?;

    let payload: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::body(
            ValidationErrorKind::InvalidBody,
            format!("JSON decode error: {}", e),
        ));
        ApiError::Validation(errors)
    })?;
    let request = validate_request(&payload)?;

    let filename = sanitize_filename(request.filename.as_deref(), &request.name);
    let output_path = state.output_dir.join(&filename);
    info!(
        "Generating PDF for {} -> {}",
        request.name,
        output_path.display()
    );

    let builder = state.builder.clone();
    let job_request = request.clone();
    let job_path = output_path.clone();
    web::block(move || builder.build(&job_request, &job_path))
        .await
        .map_err(|e| {
            error!("Report worker failed for {}: {}", output_path.display(), e);
            ApiError::Unexpected(e.to_string())
        })?
        .map_err(|e| {
            error!("PDF generation error for {}: {}", output_path.display(), e);
            ApiError::ReportGenerationFailed(e)
        })?;

    info!("PDF generation completed: {}", output_path.display());

    Ok(GeneratedReport {
        request,
        filename,
        output_path,
    })
}

fn download_url(filename: &str) -> String {
    format!("{}/{}", OUTPUT_URL_PREFIX, filename)
}

/// Service info
#[utoipa::path(
    get,
    path = "/",
    tag = "Report Service",
    responses(
        (status = 200, description = "Service is running", body = InfoResponse)
    )
)]
pub async fn root() -> impl Responder {
    HttpResponse::Ok().json(InfoResponse {
        message: "PDF Generator API is running. See /docs for Swagger UI.".to_string(),
        docs: "/docs".to_string(),
    })
}

/// Generate a report and return a link to it
#[utoipa::path(
    post,
    path = "/generate-pdf",
    tag = "Report Service",
    params(
        ("X-API-KEY" = String, Header, description = "Shared API key")
    ),
    request_body = ReportRequest,
    responses(
        (status = 200, description = "Report generated", body = GenerateReportResponse),
        (status = 403, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 422, description = "Input validation error", body = ValidationErrorBody),
        (status = 500, description = "Server misconfiguration or generation failure", body = ErrorResponse)
    )
)]
pub async fn generate_pdf(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let report = produce_report(&req, &state, &body).await?;

    Ok(HttpResponse::Ok().json(GenerateReportResponse {
        success: true,
        file_path: report.output_path.display().to_string(),
        download_url: download_url(&report.filename),
        total: report.request.total(),
        average: report.request.average(),
    }))
}

/// Generate a report and stream the PDF back
#[utoipa::path(
    post,
    path = "/download-pdf",
    tag = "Report Service",
    params(
        ("X-API-KEY" = String, Header, description = "Shared API key")
    ),
    request_body = ReportRequest,
    responses(
        (status = 200, description = "Generated PDF bytes (application/pdf)"),
        (status = 403, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 422, description = "Input validation error", body = ValidationErrorBody),
        (status = 500, description = "Server misconfiguration or generation failure", body = ErrorResponse)
    )
)]
pub async fn download_pdf(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let report = produce_report(&req, &state, &body).await?;

    let path = report.output_path.clone();
    let pdf = web::block(move || std::fs::read(path))
        .await
        .map_err(|e| ApiError::Unexpected(e.to_string()))?
        .map_err(|e| {
            error!(
                "Failed to read generated PDF {}: {}",
                report.output_path.display(),
                e
            );
            ApiError::Unexpected(e.to_string())
        })?;

    info!("PDF ready for download: {}", report.output_path.display());

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(report.filename)],
        })
        .body(pdf))
}

/// Static handler for previously generated files.
pub fn output_files(output_dir: &Path) -> Files {
    Files::new(OUTPUT_URL_PREFIX, output_dir)
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(root)))
        .service(web::resource("/generate-pdf").route(web::post().to(generate_pdf)))
        .service(web::resource("/download-pdf").route(web::post().to(download_pdf)));
}
