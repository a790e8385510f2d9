use crate::application::ports::LocalStatePersistence;
use crate::domain::entities::{LocalMetadata, MetadataPatch, StoredProject};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};
use tracing::warn;

const PROJECTS_SLOT: &str = "projects";
const METADATA_SLOT: &str = "metadata";

/// Two named JSON slots in a key-value table: the stored-project array and
/// the metadata object. Corrupt slot payloads degrade to "no local data"
/// so the app never crashes on a bad read; writes propagate their errors.
pub struct SqliteLocalState {
    pool: Pool<Sqlite>,
}

impl SqliteLocalState {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    async fn read_slot(&self, slot: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT value FROM local_state WHERE slot = ?1")
            .bind(slot)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn write_slot(&self, slot: &str, value: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO local_state (slot, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(slot) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(slot)
        .bind(value)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl LocalStatePersistence for SqliteLocalState {
    async fn get_all(&self) -> Result<Vec<StoredProject>, AppError> {
        let Some(text) = self.read_slot(PROJECTS_SLOT).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&text) {
            Ok(projects) => Ok(projects),
            Err(e) => {
                warn!("Corrupt project slot, treating as empty: {}", e);
                Ok(Vec::new())
            }
        }
    }

    async fn save_all(&self, projects: &[StoredProject]) -> Result<(), AppError> {
        let text = serde_json::to_string(projects)?;
        self.write_slot(PROJECTS_SLOT, &text).await
    }

    async fn get_metadata(&self) -> Result<LocalMetadata, AppError> {
        let Some(text) = self.read_slot(METADATA_SLOT).await? else {
            return Ok(LocalMetadata::default());
        };
        match serde_json::from_str(&text) {
            Ok(metadata) => Ok(metadata),
            Err(e) => {
                warn!("Corrupt metadata slot, using defaults: {}", e);
                Ok(LocalMetadata::default())
            }
        }
    }

    async fn save_metadata(&self, patch: MetadataPatch) -> Result<(), AppError> {
        let mut metadata = self.get_metadata().await?;
        patch.apply_to(&mut metadata);
        let text = serde_json::to_string(&metadata)?;
        self.write_slot(METADATA_SLOT, &text).await
    }

    async fn clear(&self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM local_state WHERE slot IN (?1, ?2)")
            .bind(PROJECTS_SLOT)
            .bind(METADATA_SLOT)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
