//! Error types shared by every transport and by the cache.

use std::time::Duration;

use smol_str::SmolStr;
use thiserror::Error;

use crate::response::{ErrorEnvelope, ErrorStatus};

/// Result alias used across the data layer.
pub type ApiResult<T> = Result<T, ApiError>;

/// What went wrong inside the mock provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// The requested entity does not exist.
    NotFound,
    /// The payload does not form a valid entity.
    Validation,
    /// The provider has no route for the request.
    Unsupported,
}

/// Taxonomy of failures, independent of where they came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Entity absent from a mock collection, or HTTP 404.
    NotFound,
    /// Payload rejected by a schema.
    Validation,
    /// No response was received.
    Network,
    /// The request exceeded its time budget.
    Timeout,
    /// Any other non-2xx response.
    Http,
    /// Any other mock provider failure.
    Mock,
    /// The feature behind the endpoint is switched off.
    FeatureDisabled,
}

/// Error delivered to views through the `error` side of a response.
///
/// Every variant maps to the same [`ErrorEnvelope`] shape, so callers never
/// branch on whether the failure came from the mock or the network path.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// Payload failed validation before reaching a transport.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The request was cancelled after the configured timeout.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// The mock provider raised an error.
    #[error("{message}")]
    Mock {
        /// Failure category.
        kind: MockFailure,
        /// Human readable message.
        message: String,
    },

    /// The endpoint sits behind a disabled feature toggle.
    #[error("feature `{0}` is disabled")]
    FeatureDisabled(SmolStr),
}

impl ApiError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation(_) => ErrorKind::Validation,
            ApiError::Network(_) => ErrorKind::Network,
            ApiError::Timeout(_) => ErrorKind::Timeout,
            ApiError::Http { status: 404, .. } => ErrorKind::NotFound,
            ApiError::Http { status: 422, .. } => ErrorKind::Validation,
            ApiError::Http { .. } => ErrorKind::Http,
            ApiError::Mock {
                kind: MockFailure::NotFound,
                ..
            } => ErrorKind::NotFound,
            ApiError::Mock {
                kind: MockFailure::Validation,
                ..
            } => ErrorKind::Validation,
            ApiError::Mock { .. } => ErrorKind::Mock,
            ApiError::FeatureDisabled(_) => ErrorKind::FeatureDisabled,
        }
    }

    /// Whether the error means "no such entity".
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Status field of the error envelope.
    pub fn status(&self) -> ErrorStatus {
        match self {
            ApiError::Validation(_) => ErrorStatus::label("validation_error"),
            ApiError::Network(_) => ErrorStatus::label("network_error"),
            ApiError::Timeout(_) => ErrorStatus::label("timeout"),
            ApiError::Http { status, .. } => ErrorStatus::Code(*status),
            ApiError::Mock { .. } => ErrorStatus::label("mock_error"),
            ApiError::FeatureDisabled(_) => ErrorStatus::label("feature_disabled"),
        }
    }

    /// Converts into the `{status, message}` envelope.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let message = match self {
            ApiError::Http { message, .. } | ApiError::Mock { message, .. } => message.clone(),
            other => other.to_string(),
        };
        ErrorEnvelope {
            status: self.status(),
            message,
        }
    }
}

impl From<&ApiError> for ErrorEnvelope {
    fn from(error: &ApiError) -> Self {
        error.to_envelope()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_from_both_paths() {
        let mock = ApiError::Mock {
            kind: MockFailure::NotFound,
            message: "Tenant x not found".into(),
        };
        let http = ApiError::Http {
            status: 404,
            message: "Not Found".into(),
        };
        assert!(mock.is_not_found());
        assert!(http.is_not_found());
        assert_eq!(mock.status(), ErrorStatus::label("mock_error"));
        assert_eq!(http.status(), ErrorStatus::Code(404));
    }

    #[test]
    fn test_envelope_message() {
        let envelope = ApiError::Timeout(Duration::from_millis(250)).to_envelope();
        assert_eq!(envelope.status, ErrorStatus::label("timeout"));
        assert_eq!(envelope.message, "request timed out after 250ms");
    }
}
