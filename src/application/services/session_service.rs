use crate::application::ports::SessionEvent;
use crate::application::services::project_repository::ProjectRepository;
use crate::application::services::sync_engine::{SyncEngine, SyncOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// How long a finished pass keeps its result phase visible before the
/// indicator reverts to idle. Purely a display affordance.
const SUCCESS_DISPLAY: Duration = Duration::from_secs(2);
const ERROR_DISPLAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    Idle,
    Syncing,
    Success,
    Error,
}

/// Session-wide sync state the UI renders from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: SyncPhase,
    pub pending_changes: u32,
    pub has_error: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

impl SessionState {
    fn idle() -> Self {
        Self {
            phase: SyncPhase::Idle,
            pending_changes: 0,
            has_error: false,
            last_sync: None,
        }
    }
}

/// State machine between the UI and the sync engine, with its lifecycle
/// bound to the authenticated-user session. Sync runs only on sign-in and
/// on the two explicit user-triggered entry points; there are no polling
/// timers, foreground hooks or network-state listeners.
pub struct SessionService {
    engine: Arc<SyncEngine>,
    repository: Arc<ProjectRepository>,
    state: Arc<RwLock<SessionState>>,
    current_user: Arc<RwLock<Option<String>>>,
}

impl SessionService {
    pub fn new(engine: Arc<SyncEngine>, repository: Arc<ProjectRepository>) -> Self {
        Self {
            engine,
            repository,
            state: Arc::new(RwLock::new(SessionState::idle())),
            current_user: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn handle_session_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::SignedIn { user_id } => self.handle_signed_in(user_id).await,
            SessionEvent::SignedOut => self.handle_signed_out().await,
        }
    }

    /// On session start, run exactly one automatic reconciliation: a
    /// pull-only pass when the store belongs to nobody or to a different
    /// user, otherwise just refresh the counters without touching the
    /// network.
    async fn handle_signed_in(&self, user_id: String) {
        *self.current_user.write().await = Some(user_id.clone());

        let local_is_foreign = match (
            self.repository.get_projects().await,
            self.repository.metadata().await,
        ) {
            (Ok(projects), Ok(metadata)) => {
                projects.is_empty() || metadata.user_id.as_deref() != Some(user_id.as_str())
            }
            (projects, metadata) => {
                if let Err(e) = projects {
                    warn!("Failed to read local projects on sign-in: {}", e);
                }
                if let Err(e) = metadata {
                    warn!("Failed to read local metadata on sign-in: {}", e);
                }
                true
            }
        };

        if local_is_foreign {
            info!(%user_id, "No usable local data, pulling from remote");
            let engine = self.engine.clone();
            self.run_pass(|| async move { engine.sync_from_cloud(&user_id).await })
                .await;
        } else {
            info!(%user_id, "Local data is current, refreshing counters only");
            self.refresh_counters().await;
        }
    }

    /// Sign-out clears local data only when a user was signed in during
    /// this process; a first load with no prior session leaves the store
    /// intact.
    async fn handle_signed_out(&self) {
        let previous = self.current_user.write().await.take();
        if previous.is_none() {
            return;
        }

        if let Err(e) = self.repository.clear_user_data().await {
            warn!("Failed to clear local data on sign-out: {}", e);
        }
        *self.state.write().await = SessionState::idle();
    }

    /// Explicit user-triggered full sync. Never throws; failures come back
    /// as `{ success: false, error }`.
    pub async fn manual_sync(&self) -> SyncOutcome {
        let Some(user_id) = self.current_user.read().await.clone() else {
            return SyncOutcome::failure("No active session");
        };
        let engine = self.engine.clone();
        self.run_pass(|| async move { engine.full_sync(&user_id).await })
            .await
    }

    /// Explicit user-triggered retry of records stuck in the error state.
    pub async fn retry_failed_syncs(&self) -> SyncOutcome {
        let Some(user_id) = self.current_user.read().await.clone() else {
            return SyncOutcome::failure("No active session");
        };
        let engine = self.engine.clone();
        self.run_pass(|| async move { engine.retry_failed_syncs(&user_id).await })
            .await
    }

    /// Run one reconciliation pass under the busy flag. A request arriving
    /// while a pass is in flight is coalesced into a vacuous success rather
    /// than interleaving a second pass.
    async fn run_pass<F, Fut>(&self, pass: F) -> SyncOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SyncOutcome>,
    {
        {
            let mut state = self.state.write().await;
            if state.phase == SyncPhase::Syncing {
                return SyncOutcome::empty();
            }
            state.phase = SyncPhase::Syncing;
        }

        let outcome = pass().await;
        self.finish_pass(&outcome).await;
        outcome
    }

    async fn finish_pass(&self, outcome: &SyncOutcome) {
        self.refresh_counters().await;

        let phase = if outcome.success {
            SyncPhase::Success
        } else {
            SyncPhase::Error
        };
        {
            let mut state = self.state.write().await;
            state.phase = phase;
            if !outcome.success {
                state.has_error = true;
            }
        }
        self.schedule_phase_revert(phase);
    }

    async fn refresh_counters(&self) {
        let pending = self.repository.pending_count().await.unwrap_or(0);
        let failed = self.repository.failed_count().await.unwrap_or(0);
        let last_sync = self
            .repository
            .metadata()
            .await
            .ok()
            .and_then(|m| m.last_full_sync);

        let mut state = self.state.write().await;
        state.pending_changes = pending;
        state.has_error = failed > 0;
        state.last_sync = last_sync;
    }

    /// Revert the result phase to idle after its display window, unless a
    /// newer pass has already changed it.
    fn schedule_phase_revert(&self, phase: SyncPhase) {
        let delay = match phase {
            SyncPhase::Error => ERROR_DISPLAY,
            _ => SUCCESS_DISPLAY,
        };
        let state = self.state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = state.write().await;
            if state.phase == phase {
                state.phase = SyncPhase::Idle;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        ObjectStorage, RemoteError, RemoteProjectRepository,
    };
    use crate::domain::entities::Project;
    use crate::domain::value_objects::ProjectId;
    use crate::infrastructure::database::SqliteLocalState;
    use async_trait::async_trait;
    use sqlx::{sqlite::SqlitePoolOptions, Executor};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockRemote {
        projects: Mutex<Vec<Project>>,
        select_calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteProjectRepository for MockRemote {
        async fn insert(&self, project: &Project) -> Result<Project, RemoteError> {
            let mut accepted = project.clone();
            accepted.id = ProjectId::new(format!(
                "srv-{}",
                self.projects.lock().unwrap().len() + 1
            ))
            .unwrap();
            self.projects.lock().unwrap().push(accepted.clone());
            Ok(accepted)
        }

        async fn update(&self, _id: &ProjectId, _project: &Project) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn select_all_for_user(&self, user_id: &str) -> Result<Vec<Project>, RemoteError> {
            self.select_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .projects
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn delete(&self, _id: &ProjectId) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    struct NullStorage;

    #[async_trait]
    impl ObjectStorage for NullStorage {
        async fn get_signed_url(&self, _path: &str) -> Option<String> {
            None
        }

        async fn upload(&self, path: &str, _bytes: Vec<u8>) -> Result<String, RemoteError> {
            Ok(path.to_string())
        }

        async fn remove(&self, _path: &str) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    async fn setup_session() -> (SessionService, Arc<ProjectRepository>, Arc<MockRemote>) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        pool.execute(
            r#"
            CREATE TABLE IF NOT EXISTS local_state (
                slot TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .await
        .unwrap();

        let repository = Arc::new(ProjectRepository::new(Arc::new(SqliteLocalState::new(pool))));
        let remote = Arc::new(MockRemote::default());
        let engine = Arc::new(SyncEngine::new(
            repository.clone(),
            remote.clone(),
            Arc::new(NullStorage),
        ));
        (
            SessionService::new(engine, repository.clone()),
            repository,
            remote,
        )
    }

    fn seeded_project(id: &str, name: &str) -> Project {
        let mut project = Project::new_local("user-1", name);
        project.id = ProjectId::new(id.to_string()).unwrap();
        project
    }

    #[tokio::test]
    async fn test_sign_in_pulls_when_store_is_empty() {
        let (session, repository, remote) = setup_session().await;
        remote.projects.lock().unwrap().push(seeded_project("srv-1", "Pond"));

        session
            .handle_session_event(SessionEvent::signed_in("user-1"))
            .await;

        assert_eq!(remote.select_calls.load(Ordering::SeqCst), 1);
        assert_eq!(repository.get_projects().await.unwrap().len(), 1);
        assert_eq!(session.state().await.phase, SyncPhase::Success);
    }

    #[tokio::test]
    async fn test_sign_in_pulls_when_store_belongs_to_another_user() {
        let (session, repository, remote) = setup_session().await;
        repository
            .replace_all_projects(vec![seeded_project("srv-1", "Theirs")], "user-2")
            .await
            .unwrap();
        remote.projects.lock().unwrap().push(seeded_project("srv-9", "Mine"));

        session
            .handle_session_event(SessionEvent::signed_in("user-1"))
            .await;

        assert_eq!(remote.select_calls.load(Ordering::SeqCst), 1);
        let projects = repository.get_projects().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id().as_str(), "srv-9");
    }

    #[tokio::test]
    async fn test_sign_in_with_current_local_data_stays_offline() {
        let (session, repository, remote) = setup_session().await;
        repository
            .replace_all_projects(vec![seeded_project("srv-1", "Mine")], "user-1")
            .await
            .unwrap();
        repository
            .upsert_project(Project::new_local("user-1", "Draft"))
            .await
            .unwrap();

        session
            .handle_session_event(SessionEvent::signed_in("user-1"))
            .await;

        assert_eq!(remote.select_calls.load(Ordering::SeqCst), 0);
        let state = session.state().await;
        assert_eq!(state.pending_changes, 1);
        assert_eq!(state.phase, SyncPhase::Idle);
        assert!(state.last_sync.is_some());
    }

    #[tokio::test]
    async fn test_sign_out_clears_data_only_after_a_session() {
        let (session, repository, _remote) = setup_session().await;
        repository
            .replace_all_projects(vec![seeded_project("srv-1", "Kept")], "user-1")
            .await
            .unwrap();

        // First load, nobody ever signed in: data survives.
        session.handle_session_event(SessionEvent::signed_out()).await;
        assert_eq!(repository.get_projects().await.unwrap().len(), 1);

        session
            .handle_session_event(SessionEvent::signed_in("user-1"))
            .await;
        session.handle_session_event(SessionEvent::signed_out()).await;
        assert!(repository.get_projects().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_manual_sync_requires_a_session() {
        let (session, _repository, _remote) = setup_session().await;

        let outcome = session.manual_sync().await;
        assert!(!outcome.success);
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn test_manual_sync_pushes_pending_edits() {
        let (session, repository, _remote) = setup_session().await;
        session
            .handle_session_event(SessionEvent::signed_in("user-1"))
            .await;
        repository
            .upsert_project(Project::new_local("user-1", "Draft"))
            .await
            .unwrap();

        let outcome = session.manual_sync().await;
        assert!(outcome.success);
        assert_eq!(outcome.synced_count, 1);

        let state = session.state().await;
        assert_eq!(state.pending_changes, 0);
        assert_eq!(state.phase, SyncPhase::Success);
    }

    #[tokio::test]
    async fn test_concurrent_sync_requests_coalesce() {
        let (session, _repository, _remote) = setup_session().await;
        session
            .handle_session_event(SessionEvent::signed_in("user-1"))
            .await;

        // Force the busy flag and verify a second request does not start
        // another pass.
        session.state.write().await.phase = SyncPhase::Syncing;
        let outcome = session.manual_sync().await;
        assert!(outcome.success);
        assert_eq!(outcome.synced_count, 0);
        assert_eq!(session.state().await.phase, SyncPhase::Syncing);
    }
}
