use actix_web::HttpRequest;

use super::api_key::{authorize, AuthError, ForbiddenReason};
use crate::config::ApiKeyProvider;
use crate::error::ApiError;

pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Extract the API key header, if present and valid UTF-8.
fn extract_api_key(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
}

/// Authorize a request, logging each failure kind distinctly.
pub fn validate_request_key<P>(req: &HttpRequest, provider: &P) -> Result<(), ApiError>
where
    P: ApiKeyProvider + ?Sized,
{
    authorize(provider, extract_api_key(req)).map_err(|e| {
        match e {
            AuthError::Misconfigured => log::error!("API key is not configured on the server"),
            AuthError::Forbidden(ForbiddenReason::MissingKey) => {
                log::warn!("Missing {} header", API_KEY_HEADER)
            }
            AuthError::Forbidden(ForbiddenReason::InvalidKey) => {
                log::warn!("Invalid {} provided", API_KEY_HEADER)
            }
        }
        ApiError::from(e)
    })
}
