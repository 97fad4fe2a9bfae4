use crate::{
    geofile::{document_store::StoreError, feature::FeatureId},
    query::nearby::QueryError,
};

/// Outcome of a repository operation that did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Required properties are missing on create.
    #[error("Missing required fields: {}", .missing.join(", "))]
    Validation { missing: Vec<String> },
    #[error("Attraction {0} not found")]
    NotFound(FeatureId),
    #[error("Bad request: {0}")]
    BadRequest(#[from] QueryError),
    /// The store could not persist a mutation, so it did not take effect.
    #[error("Change was not saved: {0}")]
    Persistence(#[from] StoreError),
}

/// Coarse classification of a [`RepositoryError`], for mapping to transport level responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    BadRequest,
    Persistence,
}

impl RepositoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepositoryError::Validation { .. } => ErrorKind::Validation,
            RepositoryError::NotFound(_) => ErrorKind::NotFound,
            RepositoryError::BadRequest(_) => ErrorKind::BadRequest,
            RepositoryError::Persistence(_) => ErrorKind::Persistence,
        }
    }
}
