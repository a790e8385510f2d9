use std::path::PathBuf;
use std::sync::Arc;

use crate::application::ports::{ObjectStorage, RemoteProjectRepository};
use crate::application::services::{ProjectRepository, SessionService, SyncEngine};
use crate::infrastructure::database::{Database, DbPool, SqliteLocalState};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
}

impl AppConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Platform data directory, falling back to the working directory when
    /// the platform offers none.
    pub fn from_user_dirs() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("lumiplan"))
    }

    fn database_url(&self) -> String {
        format!(
            "sqlite://{}?mode=rwc",
            self.data_dir.join("lumiplan.db").display()
        )
    }
}

/// Explicitly-owned composition root. The remote and storage boundaries are
/// injected; nothing here lives in ambient module state, so each session
/// handle owns its sync stack outright.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub repository: Arc<ProjectRepository>,
    pub engine: Arc<SyncEngine>,
    pub session: Arc<SessionService>,
}

impl AppState {
    pub async fn new(
        config: &AppConfig,
        remote: Arc<dyn RemoteProjectRepository>,
        storage: Arc<dyn ObjectStorage>,
    ) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let db_pool = Database::initialize(&config.database_url()).await?;
        let repository = Arc::new(ProjectRepository::new(Arc::new(SqliteLocalState::new(
            db_pool.clone(),
        ))));
        let engine = Arc::new(SyncEngine::new(repository.clone(), remote, storage));
        let session = Arc::new(SessionService::new(engine.clone(), repository.clone()));

        Ok(Self {
            db_pool,
            repository,
            engine,
            session,
        })
    }
}
