use std::fmt;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::ApiKeyProvider;

/// Why a caller was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    MissingKey,
    InvalidKey,
}

impl fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKey => f.write_str("missing API key"),
            Self::InvalidKey => f.write_str("invalid API key"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("forbidden: {0}")]
    Forbidden(ForbiddenReason),
    #[error("server misconfiguration: API key not configured")]
    Misconfigured,
}

/// Check a caller-supplied key against the configured one.
///
/// The expected key is fetched from `provider` on every call. A missing
/// configuration wins over a missing caller key so operators see the fault.
pub fn authorize<P>(provider: &P, provided: Option<&str>) -> Result<(), AuthError>
where
    P: ApiKeyProvider + ?Sized,
{
    let expected = provider.api_key().ok_or(AuthError::Misconfigured)?;
    let provided = provided.ok_or(AuthError::Forbidden(ForbiddenReason::MissingKey))?;

    if keys_match(provided.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(AuthError::Forbidden(ForbiddenReason::InvalidKey))
    }
}

/// Fixed-time equality over inputs of any length.
///
/// Both sides are hashed first so the comparison always runs over two
/// 32-byte digests, whatever the input lengths are.
pub fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    let provided = Sha256::digest(provided);
    let expected = Sha256::digest(expected);
    provided.as_slice().ct_eq(expected.as_slice()).into()
}
