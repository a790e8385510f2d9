use crate::application::ports::LocalStatePersistence;
use crate::domain::entities::{LocalMetadata, MetadataPatch, Project, StoredProject};
use crate::domain::value_objects::{ProjectId, SyncStatus};
use crate::shared::error::AppError;
use chrono::Utc;
use std::sync::Arc;

/// CRUD facade over the durable local store. Owns the dirty/sync-state
/// bookkeeping rules; the only component that writes the store.
///
/// Every operation reads the full collection, mutates it in memory and
/// writes it back. Per-user project counts are small, so a linear scan
/// keyed by id is enough.
pub struct ProjectRepository {
    store: Arc<dyn LocalStatePersistence>,
}

impl ProjectRepository {
    pub fn new(store: Arc<dyn LocalStatePersistence>) -> Self {
        Self { store }
    }

    pub async fn get_projects(&self) -> Result<Vec<StoredProject>, AppError> {
        self.store.get_all().await
    }

    pub async fn get_project(&self, id: &ProjectId) -> Result<Option<StoredProject>, AppError> {
        let projects = self.store.get_all().await?;
        Ok(projects.into_iter().find(|p| p.id() == id))
    }

    pub async fn get_dirty_projects(&self) -> Result<Vec<StoredProject>, AppError> {
        let projects = self.store.get_all().await?;
        Ok(projects.into_iter().filter(|p| p.is_dirty).collect())
    }

    pub async fn pending_count(&self) -> Result<u32, AppError> {
        let projects = self.store.get_all().await?;
        Ok(projects.iter().filter(|p| p.is_dirty).count() as u32)
    }

    pub async fn failed_count(&self) -> Result<u32, AppError> {
        let projects = self.store.get_all().await?;
        Ok(projects
            .iter()
            .filter(|p| p.sync_status == SyncStatus::Error)
            .count() as u32)
    }

    pub async fn metadata(&self) -> Result<LocalMetadata, AppError> {
        self.store.get_metadata().await
    }

    /// Insert or replace a project, always flagging it as needing a sync.
    /// Callers that want to record post-sync state must use the dedicated
    /// transition operations instead.
    pub async fn upsert_project(&self, project: Project) -> Result<StoredProject, AppError> {
        let mut projects = self.store.get_all().await?;
        let mut stored = StoredProject::pending(project);
        stored.project.updated_at = Utc::now();

        match projects.iter().position(|p| p.id() == stored.id()) {
            Some(index) => {
                // Replace in place; last_synced is a store-level fact that
                // survives the edit.
                stored.last_synced = projects[index].last_synced;
                projects[index] = stored.clone();
            }
            None => projects.push(stored.clone()),
        }

        self.store.save_all(&projects).await?;
        Ok(stored)
    }

    pub async fn mark_synced(&self, id: &ProjectId) -> Result<(), AppError> {
        self.transition(id, |p| p.mark_synced(Utc::now())).await
    }

    pub async fn mark_syncing(&self, id: &ProjectId) -> Result<(), AppError> {
        self.transition(id, |p| p.mark_syncing()).await
    }

    pub async fn mark_sync_error(&self, id: &ProjectId) -> Result<(), AppError> {
        self.transition(id, |p| p.mark_error()).await
    }

    /// Identity rebinding after a successful remote insert: delete the entry
    /// under the placeholder id and insert the record under its server-issued
    /// id. Not a field update.
    pub async fn rebind_project_id(
        &self,
        old_id: &ProjectId,
        replacement: StoredProject,
    ) -> Result<(), AppError> {
        let mut projects = self.store.get_all().await?;
        projects.retain(|p| p.id() != old_id);
        projects.push(replacement);
        self.store.save_all(&projects).await
    }

    /// Remove the local copy only; the remote is not contacted here.
    pub async fn delete_project(&self, id: &ProjectId) -> Result<(), AppError> {
        let mut projects = self.store.get_all().await?;
        projects.retain(|p| p.id() != id);
        self.store.save_all(&projects).await
    }

    /// Wholesale replace after a successful full pull: local state is made
    /// to exactly mirror the remote set.
    pub async fn replace_all_projects(
        &self,
        projects: Vec<Project>,
        user_id: &str,
    ) -> Result<u32, AppError> {
        let now = Utc::now();
        let stored: Vec<StoredProject> = projects
            .into_iter()
            .map(|p| StoredProject::synced(p, now))
            .collect();
        let count = stored.len() as u32;

        self.store.save_all(&stored).await?;
        self.store
            .save_metadata(MetadataPatch {
                last_full_sync: Some(now),
                user_id: Some(user_id.to_string()),
            })
            .await?;

        Ok(count)
    }

    /// Reset records stuck in the error state so the next push retries them.
    /// Returns how many were reset.
    pub async fn reset_failed_projects(&self) -> Result<u32, AppError> {
        let mut projects = self.store.get_all().await?;
        let mut reset = 0;
        for project in projects.iter_mut() {
            if project.sync_status == SyncStatus::Error {
                project.reset_for_retry();
                reset += 1;
            }
        }
        if reset > 0 {
            self.store.save_all(&projects).await?;
        }
        Ok(reset)
    }

    /// Erase the collection and metadata. Used on sign-out.
    pub async fn clear_user_data(&self) -> Result<(), AppError> {
        self.store.clear().await
    }

    async fn transition<F>(&self, id: &ProjectId, apply: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut StoredProject),
    {
        let mut projects = self.store.get_all().await?;
        // No-op when the id is not in the store.
        if let Some(project) = projects.iter_mut().find(|p| p.id() == id) {
            apply(project);
            self.store.save_all(&projects).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::SqliteLocalState;
    use sqlx::{sqlite::SqlitePoolOptions, Executor, Pool, Sqlite};

    async fn setup_repository() -> ProjectRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        initialize_schema(&pool).await;
        ProjectRepository::new(Arc::new(SqliteLocalState::new(pool)))
    }

    async fn initialize_schema(pool: &Pool<Sqlite>) {
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
    }

    #[tokio::test]
    async fn test_upsert_forces_dirty_and_pending() {
        let repository = setup_repository().await;

        let stored = repository
            .upsert_project(Project::new_local("user-1", "Deck Lights"))
            .await
            .unwrap();
        repository.mark_synced(stored.id()).await.unwrap();

        // Re-saving a just-synced record flags it as pending again.
        let synced = repository.get_project(stored.id()).await.unwrap().unwrap();
        let edited = repository.upsert_project(synced.project).await.unwrap();

        assert!(edited.is_dirty);
        assert_eq!(edited.sync_status, SyncStatus::Pending);
        assert_eq!(repository.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces_in_place_and_keeps_order() {
        let repository = setup_repository().await;

        let first = repository
            .upsert_project(Project::new_local("user-1", "Front Yard"))
            .await
            .unwrap();
        let second = repository
            .upsert_project(Project::new_local("user-1", "Back Patio"))
            .await
            .unwrap();

        let mut renamed = first.project.clone();
        renamed.name = "Front Yard v2".to_string();
        repository.upsert_project(renamed).await.unwrap();

        let projects = repository.get_projects().await.unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].id(), first.id());
        assert_eq!(projects[0].project.name, "Front Yard v2");
        assert_eq!(projects[1].id(), second.id());
    }

    #[tokio::test]
    async fn test_dirty_invariant_holds_through_transitions() {
        let repository = setup_repository().await;

        let stored = repository
            .upsert_project(Project::new_local("user-1", "Pond"))
            .await
            .unwrap();
        repository.mark_syncing(stored.id()).await.unwrap();
        repository.mark_synced(stored.id()).await.unwrap();

        for project in repository.get_projects().await.unwrap() {
            if !project.is_dirty {
                assert_eq!(project.sync_status, SyncStatus::Synced);
            }
        }
        assert_eq!(repository.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transitions_are_noops_for_unknown_ids() {
        let repository = setup_repository().await;
        let id = ProjectId::new("srv-missing".to_string()).unwrap();

        repository.mark_synced(&id).await.unwrap();
        repository.mark_sync_error(&id).await.unwrap();
        assert!(repository.get_projects().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_all_is_idempotent_and_rewrites_metadata() {
        let repository = setup_repository().await;
        repository
            .upsert_project(Project::new_local("user-1", "Old Draft"))
            .await
            .unwrap();

        let mut remote = Project::new_local("user-1", "Remote Copy");
        remote.id = ProjectId::new("srv-1".to_string()).unwrap();

        repository
            .replace_all_projects(vec![remote.clone()], "user-1")
            .await
            .unwrap();
        let first_pass = repository.get_projects().await.unwrap();

        repository
            .replace_all_projects(vec![remote], "user-1")
            .await
            .unwrap();
        let second_pass = repository.get_projects().await.unwrap();

        assert_eq!(first_pass.len(), 1);
        assert_eq!(second_pass.len(), 1);
        assert_eq!(first_pass[0].project, second_pass[0].project);
        assert!(!second_pass[0].is_dirty);
        assert_eq!(second_pass[0].sync_status, SyncStatus::Synced);

        let metadata = repository.metadata().await.unwrap();
        assert_eq!(metadata.user_id.as_deref(), Some("user-1"));
        assert!(metadata.last_full_sync.is_some());
    }

    #[tokio::test]
    async fn test_reset_failed_projects_touches_only_errors() {
        let repository = setup_repository().await;

        let failed = repository
            .upsert_project(Project::new_local("user-1", "Failed"))
            .await
            .unwrap();
        let clean = repository
            .upsert_project(Project::new_local("user-1", "Clean"))
            .await
            .unwrap();
        repository.mark_sync_error(failed.id()).await.unwrap();
        repository.mark_synced(clean.id()).await.unwrap();

        let reset = repository.reset_failed_projects().await.unwrap();
        assert_eq!(reset, 1);

        let failed_after = repository.get_project(failed.id()).await.unwrap().unwrap();
        assert_eq!(failed_after.sync_status, SyncStatus::Pending);
        assert!(failed_after.is_dirty);

        let clean_after = repository.get_project(clean.id()).await.unwrap().unwrap();
        assert_eq!(clean_after.sync_status, SyncStatus::Synced);
    }

    #[tokio::test]
    async fn test_clear_user_data_erases_collection_and_metadata() {
        let repository = setup_repository().await;
        repository
            .upsert_project(Project::new_local("user-1", "Gone"))
            .await
            .unwrap();
        repository
            .replace_all_projects(vec![], "user-1")
            .await
            .unwrap();

        repository.clear_user_data().await.unwrap();

        assert!(repository.get_projects().await.unwrap().is_empty());
        assert_eq!(repository.metadata().await.unwrap(), LocalMetadata::default());
    }
}
