use crate::domain::entities::{LocalMetadata, MetadataPatch, StoredProject};
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Durable local store: the on-disk source of truth for the UI.
///
/// Reads degrade to an empty collection / default metadata when the stored
/// payload cannot be decoded; writes propagate their errors. There is no
/// atomicity guarantee across `save_all` and `save_metadata`.
#[async_trait]
pub trait LocalStatePersistence: Send + Sync {
    async fn get_all(&self) -> Result<Vec<StoredProject>, AppError>;
    /// Atomic replace of the whole collection.
    async fn save_all(&self, projects: &[StoredProject]) -> Result<(), AppError>;
    async fn get_metadata(&self) -> Result<LocalMetadata, AppError>;
    /// Merge semantics: unset patch fields preserve the stored values.
    async fn save_metadata(&self, patch: MetadataPatch) -> Result<(), AppError>;
    async fn clear(&self) -> Result<(), AppError>;
}
