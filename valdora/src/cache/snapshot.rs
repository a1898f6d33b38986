//! Observable state of a cache entry.

use serde_json::Value;
use valdora_core::{ApiError, ApiResponse};

/// Lifecycle of a cache entry.
///
/// `Uninitialized → Loading → (Success | Error)`, and back to `Loading` on
/// every refetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryStatus {
    /// No executor has been started yet.
    #[default]
    Uninitialized,
    /// An executor is in flight.
    Loading,
    /// The last executor returned data.
    Success,
    /// The last executor failed.
    Error,
}

impl QueryStatus {
    /// Returns the status name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Uninitialized => "uninitialized",
            QueryStatus::Loading => "loading",
            QueryStatus::Success => "success",
            QueryStatus::Error => "error",
        }
    }
}

/// What every subscriber of an entry sees.
///
/// `data` is the last successful payload (possibly optimistically patched).
/// It is kept while a refetch is `Loading` and after a refetch fails, so a
/// view can keep rendering it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySnapshot {
    /// Lifecycle state.
    pub status: QueryStatus,
    /// Last known data.
    pub data: Option<Value>,
    /// Failure of the last executor run, set only in `Error`.
    pub error: Option<ApiError>,
}

impl QuerySnapshot {
    /// Whether the entry has resolved (`Success` or `Error`).
    pub fn is_settled(&self) -> bool {
        matches!(self.status, QueryStatus::Success | QueryStatus::Error)
    }

    /// Whether an executor is in flight.
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    /// Logical response of a settled entry: exactly one of data or error.
    ///
    /// Returns `None` until the entry has resolved once.
    ///
    /// ```
    /// use serde_json::json;
    /// use valdora::cache::{QuerySnapshot, QueryStatus};
    ///
    /// let snapshot = QuerySnapshot {
    ///     status: QueryStatus::Success,
    ///     data: Some(json!({"id": "1"})),
    ///     error: None,
    /// };
    /// assert_eq!(
    ///     serde_json::to_value(snapshot.response().unwrap()).unwrap(),
    ///     json!({"data": {"id": "1"}}),
    /// );
    /// ```
    pub fn response(&self) -> Option<ApiResponse> {
        match (self.status, &self.error) {
            (QueryStatus::Error, Some(error)) => Some(ApiResponse::from(error)),
            (QueryStatus::Success, _) => {
                Some(ApiResponse::Data(self.data.clone().unwrap_or(Value::Null)))
            }
            _ => None,
        }
    }

    pub(crate) fn begin_loading(&mut self) {
        self.status = QueryStatus::Loading;
        self.error = None;
    }

    pub(crate) fn resolve(&mut self, result: Result<Value, ApiError>) {
        match result {
            Ok(data) => {
                self.status = QueryStatus::Success;
                self.data = Some(data);
                self.error = None;
            }
            Err(error) => {
                self.status = QueryStatus::Error;
                self.error = Some(error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failed_refetch_keeps_last_data() {
        let mut snapshot = QuerySnapshot::default();
        snapshot.begin_loading();
        snapshot.resolve(Ok(json!([1])));
        snapshot.begin_loading();
        assert_eq!(snapshot.data, Some(json!([1])));

        snapshot.resolve(Err(ApiError::Network("refused".into())));
        assert_eq!(snapshot.status, QueryStatus::Error);
        assert_eq!(snapshot.data, Some(json!([1])));
        assert!(snapshot.response().and_then(|r| r.error().cloned()).is_some());
    }

    #[test]
    fn test_unsettled_has_no_response() {
        let mut snapshot = QuerySnapshot::default();
        assert_eq!(snapshot.response(), None);
        snapshot.begin_loading();
        assert_eq!(snapshot.response(), None);
        assert!(snapshot.is_loading());
    }
}
