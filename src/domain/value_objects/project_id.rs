use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix marking ids that were issued locally and never accepted by the
/// remote store. After a successful push the record is re-keyed to the
/// server-issued id.
const LOCAL_PREFIX: &str = "local_";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(value: String) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    /// Generate a placeholder id for a record created while offline.
    pub fn new_local() -> Self {
        Self(format!("{}{}", LOCAL_PREFIX, Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_PREFIX)
    }

    fn validate(value: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            return Err("Project id cannot be empty".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ProjectId> for String {
    fn from(id: ProjectId) -> Self {
        id.0
    }
}
