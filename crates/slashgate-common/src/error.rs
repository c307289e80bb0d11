//! Centralized error types for slashgate.
//!
//! Definition-time problems are [`ConstructionError`]s and abort startup.
//! Webhook-facing failures are [`DispatchError`]s, which convert straight into
//! HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::models::InteractionResponse;

/// A command tree, option or choice violates a platform invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstructionError {
    #[error("invalid name {name:?}: must be 1-32 letters, digits, '-' or '_'")]
    InvalidName { name: String },

    #[error("{field} of {name:?} must be at most {max} characters")]
    TooLong {
        name: String,
        field: &'static str,
        max: usize,
    },

    #[error("option {name:?}: {field} must be within [{min}, {max}], got {value}")]
    LengthOutOfRange {
        name: String,
        field: &'static str,
        value: u16,
        min: u16,
        max: u16,
    },

    #[error("option {name:?}: min_length {min} exceeds max_length {max}")]
    LengthBoundsInverted { name: String, min: u16, max: u16 },

    #[error("option {name:?}: {kind} is not a valid parameter type")]
    IllegalOptionType { name: String, kind: &'static str },

    #[error("option {name:?}: choices and autocomplete are mutually exclusive")]
    ChoicesWithAutocomplete { name: String },

    #[error("option {name:?}: at most 25 choices are allowed")]
    TooManyChoices { name: String },

    #[error("required option {name:?} follows an optional option in {command:?}")]
    RequiredAfterOptional { command: String, name: String },

    #[error("{parent:?} cannot hold more than {max} entries")]
    CapacityExceeded { parent: String, max: usize },

    #[error("group {parent:?} is already nested; it cannot contain group {child:?}")]
    NestingTooDeep { parent: String, child: String },

    #[error("{parent:?} already contains {name:?}")]
    DuplicateName { parent: String, name: String },

    #[error("only top-level commands may set {field}; {name:?} is nested")]
    TopLevelOnly { name: String, field: &'static str },

    #[error("{name:?} is nested inside a group and cannot be registered on its own")]
    NotRoot { name: String },

    #[error("autocomplete callback registered for unknown option {option:?} on {command:?}")]
    UnknownAutocompleteOption { command: String, option: String },
}

/// Misuse of a resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamespaceError {
    #[error("focused option is only available on autocomplete interactions")]
    NotAutocomplete,
}

/// Misuse of the response channel of an interaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseError {
    #[error("interaction has already been responded to")]
    AlreadyResponded,

    #[error("response transport failed: {0}")]
    Transport(String),
}

/// Errors produced while handling an inbound webhook request.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("missing signature headers")]
    MissingSignature,

    #[error("invalid request signature")]
    InvalidSignature,

    #[error("malformed interaction body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("interaction carries no command data")]
    MissingData,

    #[error("command {name:?} is not implemented")]
    CommandNotFound { name: String },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error body for non-200 responses.
#[derive(Serialize)]
struct ErrorResponse {
    code: u16,
    error: String,
    message: String,
}

/// Ephemeral text shown to the invoking user when a command cannot be served.
pub const UNAVAILABLE_MESSAGE: &str = "This command is not available right now.";

impl DispatchError {
    /// Map error to HTTP status code.
    ///
    /// The platform treats any non-200 as a delivery failure, so only transport
    /// level problems get one.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingSignature | Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::MalformedBody(_) | Self::MissingData => StatusCode::BAD_REQUEST,
            Self::CommandNotFound { .. } => StatusCode::OK,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error code string for programmatic handling.
    pub fn error_code(&self) -> &str {
        match self {
            Self::MissingSignature => "MISSING_SIGNATURE",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::MalformedBody(_) => "MALFORMED_BODY",
            Self::MissingData => "MISSING_DATA",
            Self::CommandNotFound { .. } => "COMMAND_NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            DispatchError::CommandNotFound { name } => {
                tracing::warn!(command = %name, "interaction for unregistered command");
                // Still a 200: the user gets a short notice, nothing else leaks.
                return (
                    status,
                    axum::Json(InteractionResponse::ephemeral(UNAVAILABLE_MESSAGE)),
                )
                    .into_response();
            }
            DispatchError::Internal(e) => {
                tracing::error!("Internal error: {e:#}");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            code: status.as_u16(),
            error: self.error_code().to_string(),
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Convenience type alias for dispatch results.
pub type DispatchResult<T> = Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_failures_are_unauthorized() {
        assert_eq!(DispatchError::MissingSignature.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(DispatchError::InvalidSignature.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn unknown_command_still_answers_ok() {
        let err = DispatchError::CommandNotFound { name: "ghost".into() };
        assert_eq!(err.status_code(), StatusCode::OK);
        assert_eq!(err.into_response().status(), StatusCode::OK);
    }

    #[test]
    fn construction_errors_name_the_offender() {
        let err = ConstructionError::CapacityExceeded { parent: "buy".into(), max: 25 };
        assert_eq!(err.to_string(), "\"buy\" cannot hold more than 25 entries");
    }
}
