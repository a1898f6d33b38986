//! Logical response shapes returned to views.
//!
//! - [`ApiResponse`] serializes as exactly one of `{"data": …}` or
//!   `{"error": {"status", "message"}}`.
//! - [`Page`] is the collection-list envelope `{items, total, page, limit}`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

use crate::error::{ApiError, ApiResult};

/// `status` field of an error envelope: an HTTP code or a symbolic label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorStatus {
    /// HTTP status code of a non-2xx response.
    Code(u16),
    /// Symbolic status such as `mock_error` or `timeout`.
    Label(SmolStr),
}

impl ErrorStatus {
    /// Builds a label status from a static string.
    pub const fn label(label: &'static str) -> Self {
        ErrorStatus::Label(SmolStr::new_static(label))
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorStatus::Code(code) => write!(f, "{code}"),
            ErrorStatus::Label(label) => f.write_str(label),
        }
    }
}

/// Error side of a logical response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// HTTP code or symbolic label.
    pub status: ErrorStatus,
    /// Message suitable for an inline alert.
    pub message: String,
}

/// Logical response: data or error, never both.
///
/// ```
/// use serde_json::json;
/// use valdora_core::{ApiError, ApiResponse};
///
/// let ok = ApiResponse::from(Ok::<_, ApiError>(json!({"id": "1"})));
/// assert_eq!(serde_json::to_value(&ok).unwrap(), json!({"data": {"id": "1"}}));
///
/// let failed = ApiResponse::from(Err::<serde_json::Value, _>(ApiError::Network("refused".into())));
/// assert_eq!(
///     serde_json::to_value(&failed).unwrap(),
///     json!({"error": {"status": "network_error", "message": "network error: refused"}}),
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiResponse {
    /// Successful payload.
    Data(Value),
    /// Failure envelope.
    Error(ErrorEnvelope),
}

impl ApiResponse {
    /// Returns the payload of a successful response.
    pub fn data(&self) -> Option<&Value> {
        match self {
            ApiResponse::Data(value) => Some(value),
            ApiResponse::Error(_) => None,
        }
    }

    /// Returns the error envelope of a failed response.
    pub fn error(&self) -> Option<&ErrorEnvelope> {
        match self {
            ApiResponse::Data(_) => None,
            ApiResponse::Error(error) => Some(error),
        }
    }
}

impl From<ApiResult<Value>> for ApiResponse {
    fn from(result: ApiResult<Value>) -> Self {
        match result {
            Ok(value) => ApiResponse::Data(value),
            Err(error) => ApiResponse::Error(error.to_envelope()),
        }
    }
}

impl From<&ApiError> for ApiResponse {
    fn from(error: &ApiError) -> Self {
        ApiResponse::Error(error.to_envelope())
    }
}

/// Collection-list envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items of the requested page.
    pub items: Vec<T>,
    /// Number of items matching the filters, across all pages.
    pub total: usize,
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
}

impl<T> Page<T> {
    /// Number of pages needed to hold `total` items.
    pub fn total_pages(&self) -> usize {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(self.limit as usize)
    }

    /// Maps every item, keeping the pagination fields.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_error_status_serializes_untagged() {
        let envelope = ErrorEnvelope {
            status: ErrorStatus::Code(503),
            message: "unavailable".into(),
        };
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"status": 503, "message": "unavailable"})
        );
    }

    #[test]
    fn test_response_round_trips_error_side() {
        let raw = json!({"error": {"status": "mock_error", "message": "boom"}});
        let response: ApiResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.data(), None);
        assert_eq!(
            response.error().map(|e| &e.status),
            Some(&ErrorStatus::label("mock_error"))
        );
    }

    #[test]
    fn test_total_pages() {
        let page = Page::<u8> {
            items: vec![],
            total: 21,
            page: 1,
            limit: 10,
        };
        assert_eq!(page.total_pages(), 3);
    }
}
