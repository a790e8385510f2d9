pub mod project_repository;
pub mod session_service;
pub mod sync_engine;

pub use project_repository::ProjectRepository;
pub use session_service::{SessionService, SessionState, SyncPhase};
pub use sync_engine::{SyncEngine, SyncOutcome};
