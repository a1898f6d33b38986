//! Mock provider errors.

use thiserror::Error;
use valdora_core::{ApiError, EntityId, MockFailure, Resource};

/// Failure raised by a mock operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MockError {
    /// No entity with `id` in the `resource` collection.
    #[error("{} with id {id} not found", .resource.as_str())]
    NotFound {
        /// Collection that was searched.
        resource: Resource,
        /// Missing identifier.
        id: EntityId,
    },

    /// Payload does not form a valid entity.
    #[error("invalid payload: {0}")]
    Validation(String),

    /// The provider has no route for the request.
    #[error("unsupported mock request: {0}")]
    Unsupported(String),
}

impl MockError {
    pub(crate) fn not_found(resource: Resource, id: &EntityId) -> Self {
        MockError::NotFound {
            resource,
            id: id.clone(),
        }
    }

    /// Failure category carried into [`ApiError::Mock`].
    pub fn failure(&self) -> MockFailure {
        match self {
            MockError::NotFound { .. } => MockFailure::NotFound,
            MockError::Validation(_) => MockFailure::Validation,
            MockError::Unsupported(_) => MockFailure::Unsupported,
        }
    }
}

impl From<MockError> for ApiError {
    fn from(error: MockError) -> Self {
        ApiError::Mock {
            kind: error.failure(),
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for MockError {
    fn from(error: serde_json::Error) -> Self {
        MockError::Validation(error.to_string())
    }
}
