pub mod project_id;
pub mod sync_status;

pub use project_id::ProjectId;
pub use sync_status::SyncStatus;
