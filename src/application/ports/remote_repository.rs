use crate::domain::entities::Project;
use crate::domain::value_objects::ProjectId;
use crate::shared::error::AppError;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    /// The targeted row does not exist (or is not visible) remotely. During
    /// a push this is what distinguishes a conflict from a plain failure.
    #[error("No matching row for project: {0}")]
    RowNotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl RemoteError {
    pub fn is_row_not_found(&self) -> bool {
        matches!(self, RemoteError::RowNotFound(_))
    }
}

impl From<RemoteError> for AppError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::RowNotFound(msg) => AppError::NotFound(msg),
            other => AppError::Remote(other.to_string()),
        }
    }
}

/// CRUD boundary over the backend's project table. The sole source of
/// server-authoritative data.
#[async_trait]
pub trait RemoteProjectRepository: Send + Sync {
    /// Insert a new project; the returned copy carries the server-issued id
    /// and timestamps.
    async fn insert(&self, project: &Project) -> Result<Project, RemoteError>;
    async fn update(&self, id: &ProjectId, project: &Project) -> Result<(), RemoteError>;
    /// Full record set for a user, ordered by creation time descending.
    async fn select_all_for_user(&self, user_id: &str) -> Result<Vec<Project>, RemoteError>;
    async fn delete(&self, id: &ProjectId) -> Result<(), RemoteError>;
}

/// Object-storage boundary for project images.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Resolve a time-limited display URL; `None` when resolution fails.
    /// Callers must not assume validity beyond ~50 minutes.
    async fn get_signed_url(&self, path: &str) -> Option<String>;
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, RemoteError>;
    async fn remove(&self, path: &str) -> Result<(), RemoteError>;
}
