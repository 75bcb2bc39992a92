use crate::infra::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("caller is not authenticated")]
    Unauthenticated,

    /// A store read or write failed; the whole operation fails with it.
    #[error("aggregation failed: {0}")]
    AggregationFailure(#[source] StoreError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Conflict(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{} {}", entity, id)),
            other => Self::AggregationFailure(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Resolves the caller's identity or fails before any store access.
pub fn require_identity(identity: Option<&str>) -> ServiceResult<&str> {
    identity
        .filter(|id| !id.trim().is_empty())
        .ok_or(ServiceError::Unauthenticated)
}
