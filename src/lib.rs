pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::ports::{
    LocalStatePersistence, ObjectStorage, RemoteError, RemoteProjectRepository, SessionEvent,
};
pub use application::services::{
    ProjectRepository, SessionService, SessionState, SyncEngine, SyncOutcome, SyncPhase,
};
pub use domain::entities::{LocalMetadata, Project, StoredProject};
pub use domain::value_objects::{ProjectId, SyncStatus};
pub use shared::error::AppError;
pub use state::{AppConfig, AppState};

/// Install the process-wide tracing subscriber. Call once at startup.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lumiplan=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
