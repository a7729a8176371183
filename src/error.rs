//! Error types shared across trompet.
//!
//! Configuration and normalization errors live next to their modules
//! ([`crate::config::ConfigError`], [`crate::config::ValidationError`],
//! [`crate::commit::NormalizeError`]); this module holds the ones that cross
//! module boundaries.

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;

use crate::commit::NormalizeError;
use crate::config::ValidationError;

// ============================================================================
// Ingress Errors (webhook handling)
// ============================================================================

/// Why an inbound webhook was refused.
#[derive(Debug, Error)]
pub enum IngressError {
    #[error("unknown project token")]
    UnknownToken,

    #[error("project {project:?} has no {listener:?} listener")]
    UnknownListener { project: String, listener: String },

    #[error("missing payload")]
    MissingPayload,

    #[error("malformed payload: {0}")]
    Malformed(#[from] NormalizeError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("authorization failed")]
    Unauthorized,
}

impl IngressError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnknownToken | Self::UnknownListener { .. } => StatusCode::NOT_FOUND,
            Self::MissingPayload | Self::Malformed(_) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    /// Static label for log fields.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownToken => "unknown_token",
            Self::UnknownListener { .. } => "unknown_listener",
            Self::MissingPayload => "missing_payload",
            Self::Malformed(_) => "malformed_payload",
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized => "unauthorized",
        }
    }
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        // Providers only look at the status; the body is for humans with curl.
        (self.status(), self.to_string()).into_response()
    }
}

// ============================================================================
// Registry Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("listener kind {0:?} already registered")]
    Duplicate(String),

    #[error("no listener kind named {0:?}")]
    Unknown(String),
}

// ============================================================================
// Reconfiguration Errors
// ============================================================================

/// A configuration was rejected as a whole; nothing was applied.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("configuration rejected: {}", join_errors(.errors))]
pub struct ReconfigureError {
    pub errors: Vec<ValidationError>,
}

impl From<Vec<ValidationError>> for ReconfigureError {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
