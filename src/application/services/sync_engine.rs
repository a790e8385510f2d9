use crate::application::ports::{ObjectStorage, RemoteProjectRepository};
use crate::application::services::project_repository::ProjectRepository;
use crate::domain::entities::{Project, StoredProject};
use crate::domain::value_objects::ProjectId;
use crate::shared::error::AppError;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Minimum gap between two pull phases. Pushes are never rate limited.
const PULL_COOLDOWN_SECS: i64 = 5 * 60;

/// How long a signed image URL is trusted before the UI should ask for a
/// fresh one.
const SIGNED_URL_TTL_SECS: i64 = 50 * 60;

/// Aggregated result of a push/pull pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub success: bool,
    pub synced_count: u32,
    pub conflict_count: u32,
    pub failed_count: u32,
    pub error: Option<String>,
}

impl SyncOutcome {
    pub fn empty() -> Self {
        Self {
            success: true,
            synced_count: 0,
            conflict_count: 0,
            failed_count: 0,
            error: None,
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            synced_count: 0,
            conflict_count: 0,
            failed_count: 0,
            error: Some(error.to_string()),
        }
    }

    pub fn merge(self, other: SyncOutcome) -> Self {
        Self {
            success: self.success && other.success,
            synced_count: self.synced_count + other.synced_count,
            conflict_count: self.conflict_count + other.conflict_count,
            failed_count: self.failed_count + other.failed_count,
            error: self.error.or(other.error),
        }
    }
}

/// Orchestrates push (local -> remote) and pull (remote -> local) passes.
/// Reads and writes local state only through the [`ProjectRepository`].
pub struct SyncEngine {
    repository: Arc<ProjectRepository>,
    remote: Arc<dyn RemoteProjectRepository>,
    storage: Arc<dyn ObjectStorage>,
}

impl SyncEngine {
    pub fn new(
        repository: Arc<ProjectRepository>,
        remote: Arc<dyn RemoteProjectRepository>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            repository,
            remote,
            storage,
        }
    }

    pub fn repository(&self) -> &Arc<ProjectRepository> {
        &self.repository
    }

    /// Push every dirty record to the remote store. The dirty set is
    /// snapshotted once at pass start; records are per-record isolated, so
    /// one failure never stops the rest of the pass.
    pub async fn sync_to_cloud(&self, user_id: &str) -> SyncOutcome {
        let dirty = match self.repository.get_dirty_projects().await {
            Ok(dirty) => dirty,
            Err(e) => return SyncOutcome::failure(e),
        };

        info!(user_id, count = dirty.len(), "Pushing dirty projects");
        let mut outcome = SyncOutcome::empty();

        for stored in dirty {
            let id = stored.id().clone();
            if let Err(e) = self.repository.mark_syncing(&id).await {
                warn!(project_id = %id, "Failed to mark project as syncing: {}", e);
                outcome.failed_count += 1;
                continue;
            }

            if id.is_local() {
                self.push_create(&id, &stored, &mut outcome).await;
            } else {
                self.push_update(&id, &stored, &mut outcome).await;
            }
        }

        outcome
    }

    /// A record that has never been accepted by the remote: insert it, then
    /// rebind its identity to the server-issued id.
    async fn push_create(&self, id: &ProjectId, stored: &StoredProject, outcome: &mut SyncOutcome) {
        match self.remote.insert(&stored.project).await {
            Ok(accepted) => {
                let replacement = StoredProject::synced(accepted, Utc::now());
                match self.repository.rebind_project_id(id, replacement).await {
                    Ok(()) => outcome.synced_count += 1,
                    Err(e) => {
                        warn!(project_id = %id, "Identity rebinding failed: {}", e);
                        outcome.failed_count += 1;
                    }
                }
            }
            Err(e) => {
                warn!(project_id = %id, "Remote insert failed: {}", e);
                self.flag_error(id, outcome).await;
            }
        }
    }

    /// A record the remote already knows: update it in place. A vanished
    /// remote row is a conflict, counted separately and left for the user
    /// to reconcile manually.
    async fn push_update(&self, id: &ProjectId, stored: &StoredProject, outcome: &mut SyncOutcome) {
        match self.remote.update(id, &stored.project).await {
            Ok(()) => match self.repository.mark_synced(id).await {
                Ok(()) => outcome.synced_count += 1,
                Err(e) => {
                    warn!(project_id = %id, "Failed to mark project as synced: {}", e);
                    outcome.failed_count += 1;
                }
            },
            Err(e) if e.is_row_not_found() => {
                warn!(project_id = %id, "Remote row vanished, flagging conflict");
                outcome.conflict_count += 1;
                if let Err(e) = self.repository.mark_sync_error(id).await {
                    warn!(project_id = %id, "Failed to flag conflict: {}", e);
                }
            }
            Err(e) => {
                warn!(project_id = %id, "Remote update failed: {}", e);
                self.flag_error(id, outcome).await;
            }
        }
    }

    async fn flag_error(&self, id: &ProjectId, outcome: &mut SyncOutcome) {
        outcome.failed_count += 1;
        if let Err(e) = self.repository.mark_sync_error(id).await {
            warn!(project_id = %id, "Failed to mark project as errored: {}", e);
        }
    }

    /// Replace the local collection with the user's full remote record set.
    /// Destructive to local-only changes; callers are responsible for only
    /// pulling when no conflicting local edits are in flight.
    pub async fn sync_from_cloud(&self, user_id: &str) -> SyncOutcome {
        let mut projects = match self.remote.select_all_for_user(user_id).await {
            Ok(projects) => projects,
            Err(e) => return SyncOutcome::failure(e),
        };

        for project in projects.iter_mut() {
            self.refresh_image_url(project).await;
        }

        match self.repository.replace_all_projects(projects, user_id).await {
            Ok(count) => {
                info!(user_id, count, "Pulled remote projects");
                SyncOutcome {
                    synced_count: count,
                    ..SyncOutcome::empty()
                }
            }
            Err(e) => SyncOutcome::failure(e),
        }
    }

    /// Resolve a fresh signed display URL for the project image, keeping the
    /// previously stored URL when resolution fails.
    async fn refresh_image_url(&self, project: &mut Project) {
        let Some(path) = project.image_path.clone() else {
            return;
        };
        match self.storage.get_signed_url(&path).await {
            Some(url) => {
                let now = Utc::now();
                project.image_url = Some(url);
                project.image_url_cached_at = Some(now);
                project.image_url_expires_at = Some(now + Duration::seconds(SIGNED_URL_TTL_SECS));
            }
            None => {
                debug!(%path, "Signed URL resolution failed, keeping cached URL");
            }
        }
    }

    /// Push, then pull. The pull phase is skipped entirely while the last
    /// full sync is inside the cooldown window; the skipped portion counts
    /// as a vacuous success.
    pub async fn full_sync(&self, user_id: &str) -> SyncOutcome {
        let push = self.sync_to_cloud(user_id).await;

        let metadata = match self.repository.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => return push.merge(SyncOutcome::failure(e)),
        };
        if let Some(last) = metadata.last_full_sync {
            let elapsed = Utc::now().signed_duration_since(last);
            if elapsed < Duration::seconds(PULL_COOLDOWN_SECS) {
                debug!(user_id, "Pull skipped, last full sync {}s ago", elapsed.num_seconds());
                return push;
            }
        }

        push.merge(self.sync_from_cloud(user_id).await)
    }

    /// Reset error records to pending, then re-run the push phase only.
    pub async fn retry_failed_syncs(&self, user_id: &str) -> SyncOutcome {
        match self.repository.reset_failed_projects().await {
            Ok(reset) => {
                info!(user_id, reset, "Retrying failed syncs");
                self.sync_to_cloud(user_id).await
            }
            Err(e) => SyncOutcome::failure(e),
        }
    }

    /// Optimistic delete: the local copy goes away immediately, the remote
    /// delete (and image removal) runs detached and best-effort afterwards.
    pub async fn delete_project(&self, id: &ProjectId) -> Result<(), AppError> {
        let existing = self.repository.get_project(id).await?;
        self.repository.delete_project(id).await?;

        let Some(stored) = existing else {
            return Ok(());
        };
        // A placeholder id was never accepted remotely; nothing to delete.
        if stored.id().is_local() {
            return Ok(());
        }

        let remote = self.remote.clone();
        let storage = self.storage.clone();
        let remote_id = stored.id().clone();
        let image_path = stored.project.image_path.clone();
        tokio::spawn(async move {
            if let Err(e) = remote.delete(&remote_id).await {
                warn!(project_id = %remote_id, "Best-effort remote delete failed: {}", e);
            }
            if let Some(path) = image_path {
                if let Err(e) = storage.remove(&path).await {
                    warn!(%path, "Best-effort image removal failed: {}", e);
                }
            }
        });

        Ok(())
    }
}
