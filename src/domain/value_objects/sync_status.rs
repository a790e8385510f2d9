use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-record sync state. Transitions: `Pending -> Syncing -> (Synced | Error)`,
/// and `Error -> Pending` only via an explicit retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Synced,
    Pending,
    Syncing,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::Pending => "pending",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Error => "error",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for SyncStatus {
    fn from(value: &str) -> Self {
        match value {
            "synced" => SyncStatus::Synced,
            "syncing" => SyncStatus::Syncing,
            "error" => SyncStatus::Error,
            // Unknown values are treated as still needing a sync.
            _ => SyncStatus::Pending,
        }
    }
}
