//! Input validation for report requests.
//!
//! Validation runs over the raw JSON body so that every field is checked and
//! all problems are reported together, including type mismatches that a typed
//! deserializer would stop at.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::filename::{has_pdf_extension, is_allowed_char};
use super::model::ReportRequest;

pub const MIN_AGE: i64 = 0;
pub const MAX_AGE: i64 = 150;

/// Machine-readable reason attached to each validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// Body is not a JSON object or could not be parsed.
    InvalidBody,
    Missing,
    EmptyName,
    InvalidAge,
    InvalidScore,
    InvalidFilename,
}

impl ValidationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidBody => "invalid_body",
            Self::Missing => "missing",
            Self::EmptyName => "empty_name",
            Self::InvalidAge => "invalid_age",
            Self::InvalidScore => "invalid_score",
            Self::InvalidFilename => "invalid_filename",
        }
    }
}

/// A single violated rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Offending field, `None` for problems with the body as a whole.
    pub field: Option<String>,
    pub kind: ValidationErrorKind,
    pub message: String,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        kind: ValidationErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: Some(field.into()),
            kind,
            message: message.into(),
        }
    }

    pub fn body(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            field: None,
            kind,
            message: message.into(),
        }
    }

    pub fn missing(field: &str) -> Self {
        Self::new(field, ValidationErrorKind::Missing, "Field required")
    }

    /// Location path in the `["body", field]` form clients expect.
    pub fn loc(&self) -> Vec<String> {
        let mut loc = vec!["body".to_string()];
        if let Some(field) = &self.field {
            loc.push(field.clone());
        }
        loc
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "[{}] {}", field, self.message),
            None => write!(f, "[body] {}", self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors for one request.
#[derive(Debug, Default, Clone)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// Whether an error of `kind` was recorded for `field`.
    pub fn has(&self, field: &str, kind: ValidationErrorKind) -> bool {
        self.errors
            .iter()
            .any(|e| e.kind == kind && e.field.as_deref() == Some(field))
    }
}

/// One entry of the 422 response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrorDetail {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Body returned with 422 Unprocessable Entity.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrorBody {
    pub detail: String,
    pub errors: Vec<ValidationErrorDetail>,
}

impl From<&ValidationErrors> for ValidationErrorBody {
    fn from(errors: &ValidationErrors) -> Self {
        Self {
            detail: "Input validation error".to_string(),
            errors: errors
                .iter()
                .map(|e| ValidationErrorDetail {
                    loc: e.loc(),
                    msg: e.message.clone(),
                    kind: e.kind.as_str().to_string(),
                })
                .collect(),
        }
    }
}

// ============================================================================
// Validation functions
// ============================================================================

/// Validate a parsed JSON body into a [`ReportRequest`].
pub fn validate_request(body: &Value) -> Result<ReportRequest, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let Some(fields) = body.as_object() else {
        errors.add(ValidationError::body(
            ValidationErrorKind::InvalidBody,
            "Input should be a valid JSON object",
        ));
        return Err(errors);
    };

    let name = validate_name(field(fields, "name"), &mut errors);
    let age = validate_age(field(fields, "age"), &mut errors);
    let score1 = validate_score(field(fields, "score1"), "score1", &mut errors);
    let score2 = validate_score(field(fields, "score2"), "score2", &mut errors);
    let filename = validate_filename_field(field(fields, "filename"), &mut errors);

    match (name, age, score1, score2) {
        (Some(name), Some(age), Some(score1), Some(score2)) if errors.is_empty() => {
            Ok(ReportRequest {
                name,
                age,
                score1,
                score2,
                filename,
            })
        }
        _ => Err(errors),
    }
}

/// Look up a field, treating explicit `null` as absent.
fn field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields.get(key).filter(|v| !v.is_null())
}

/// Name must be a string that is non-empty after trimming.
pub fn validate_name(value: Option<&Value>, errors: &mut ValidationErrors) -> Option<String> {
    let Some(value) = value else {
        errors.add(ValidationError::missing("name"));
        return None;
    };

    let Some(raw) = value.as_str() else {
        errors.add(ValidationError::new(
            "name",
            ValidationErrorKind::EmptyName,
            "name must be a non-empty string",
        ));
        return None;
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.add(ValidationError::new(
            "name",
            ValidationErrorKind::EmptyName,
            "name must not be empty or whitespace",
        ));
        return None;
    }

    Some(trimmed.to_string())
}

/// Age must be an integer in `[MIN_AGE, MAX_AGE]`.
pub fn validate_age(value: Option<&Value>, errors: &mut ValidationErrors) -> Option<u32> {
    let Some(value) = value else {
        errors.add(ValidationError::missing("age"));
        return None;
    };

    let Some(age) = coerce_integer(value) else {
        errors.add(ValidationError::new(
            "age",
            ValidationErrorKind::InvalidAge,
            "age must be a valid integer",
        ));
        return None;
    };

    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        errors.add(ValidationError::new(
            "age",
            ValidationErrorKind::InvalidAge,
            format!("age must be between {} and {}", MIN_AGE, MAX_AGE),
        ));
        return None;
    }

    u32::try_from(age).ok()
}

/// Scores must be finite, non-negative numbers.
pub fn validate_score(
    value: Option<&Value>,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<f64> {
    let Some(value) = value else {
        errors.add(ValidationError::missing(field));
        return None;
    };

    let Some(score) = coerce_float(value) else {
        errors.add(ValidationError::new(
            field,
            ValidationErrorKind::InvalidScore,
            format!("{} must be a valid number", field),
        ));
        return None;
    };

    if score < 0.0 {
        errors.add(ValidationError::new(
            field,
            ValidationErrorKind::InvalidScore,
            format!("{} must be greater than or equal to 0", field),
        ));
        return None;
    }

    Some(score)
}

fn validate_filename_field(value: Option<&Value>, errors: &mut ValidationErrors) -> Option<String> {
    let value = value?;

    let Some(raw) = value.as_str() else {
        errors.add(ValidationError::new(
            "filename",
            ValidationErrorKind::InvalidFilename,
            "filename must be a string",
        ));
        return None;
    };

    match validate_filename(raw) {
        Ok(()) => Some(raw.to_string()),
        Err(message) => {
            errors.add(ValidationError::new(
                "filename",
                ValidationErrorKind::InvalidFilename,
                message,
            ));
            None
        }
    }
}

/// Check a caller-supplied filename, reporting the first rule it breaks.
pub fn validate_filename(value: &str) -> Result<(), &'static str> {
    if value.contains('/') || value.contains('\\') {
        return Err("filename must not include path separators");
    }
    if !has_pdf_extension(value) {
        return Err("filename must end with .pdf");
    }
    if !value.chars().all(is_allowed_char) {
        return Err(
            "filename contains invalid characters (allowed: letters, numbers, '-', '_', '.')",
        );
    }
    Ok(())
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn coerce_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}
