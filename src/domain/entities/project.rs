use crate::domain::value_objects::{ProjectId, SyncStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A lighting-design project as the remote store knows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: ProjectId,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub image_url_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub image_url_cached_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Build a project that only exists locally so far. It gets a
    /// placeholder id and is re-keyed once the remote accepts it.
    pub fn new_local(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::new_local(),
            user_id: user_id.into(),
            name: name.into(),
            description: None,
            address: None,
            phone_number: None,
            image_url: None,
            image_path: None,
            image_url_expires_at: None,
            image_url_cached_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A project as the local store keeps it: the remote fields plus the
/// dirty/sync bookkeeping. Invariant: `is_dirty == false` implies
/// `sync_status == Synced`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredProject {
    #[serde(flatten)]
    pub project: Project,
    pub is_dirty: bool,
    pub sync_status: SyncStatus,
    #[serde(default)]
    pub last_synced: Option<DateTime<Utc>>,
}

impl StoredProject {
    /// Wrap a freshly mutated project: every local write is assumed to
    /// require syncing.
    pub fn pending(project: Project) -> Self {
        Self {
            project,
            is_dirty: true,
            sync_status: SyncStatus::Pending,
            last_synced: None,
        }
    }

    /// Wrap a project that exactly mirrors the remote copy.
    pub fn synced(project: Project, synced_at: DateTime<Utc>) -> Self {
        Self {
            project,
            is_dirty: false,
            sync_status: SyncStatus::Synced,
            last_synced: Some(synced_at),
        }
    }

    pub fn id(&self) -> &ProjectId {
        &self.project.id
    }

    pub fn mark_synced(&mut self, synced_at: DateTime<Utc>) {
        self.is_dirty = false;
        self.sync_status = SyncStatus::Synced;
        self.last_synced = Some(synced_at);
    }

    pub fn mark_syncing(&mut self) {
        self.sync_status = SyncStatus::Syncing;
    }

    pub fn mark_error(&mut self) {
        self.is_dirty = true;
        self.sync_status = SyncStatus::Error;
    }

    /// Reset a failed record so the next push picks it up again.
    pub fn reset_for_retry(&mut self) {
        self.is_dirty = true;
        self.sync_status = SyncStatus::Pending;
    }
}

/// Store-wide bookkeeping, rewritten on every full sync and cleared on
/// sign-out.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocalMetadata {
    #[serde(default)]
    pub last_full_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Partial metadata update; `None` fields leave the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct MetadataPatch {
    pub last_full_sync: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
}

impl MetadataPatch {
    pub fn apply_to(self, metadata: &mut LocalMetadata) {
        if let Some(last_full_sync) = self.last_full_sync {
            metadata.last_full_sync = Some(last_full_sync);
        }
        if let Some(user_id) = self.user_id {
            metadata.user_id = Some(user_id);
        }
    }
}
