//! Persistent session state store
//!
//! Durable key-value storage for the workflow step and the in-progress
//! generation request, plus the download cache. Write-through: every
//! controller mutation of step or request lands here immediately, so a
//! crash loses at most nothing.
//!
//! Keys follow the original client's storage layout: `savedStep`,
//! `savedGeneratorTaskDto`, and `"{exportFormat}{taskId}"` for cached
//! downloads.

use flashgen_common::models::{
    ExportFormat, FlashcardFile, GenerationRequest, StoredFlashcardFile, TaskId, WorkflowStep,
};
use flashgen_common::Result;
use sqlx::SqlitePool;

const KEY_STEP: &str = "savedStep";
const KEY_REQUEST: &str = "savedGeneratorTaskDto";

/// Session store over a SQLite pool
#[derive(Clone)]
pub struct SessionStore {
    db: SqlitePool,
}

impl SessionStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Restore the saved workflow step
    ///
    /// `None` when nothing was saved or the saved value is not a recognized
    /// step name (defensive against a newer/older writer).
    pub async fn get_step(&self) -> Result<Option<WorkflowStep>> {
        let raw = self.get_raw(KEY_STEP).await?;
        Ok(raw.as_deref().and_then(WorkflowStep::from_saved))
    }

    /// Persist the current workflow step
    pub async fn set_step(&self, step: WorkflowStep) -> Result<()> {
        self.set_raw(KEY_STEP, step.as_str()).await
    }

    /// Restore the saved generation request
    ///
    /// `None` when nothing was saved; a corrupt record is treated the same
    /// way rather than failing initialization.
    pub async fn get_request(&self) -> Result<Option<GenerationRequest>> {
        match self.get_raw(KEY_REQUEST).await? {
            Some(json) => match serde_json::from_str(&json) {
                Ok(request) => Ok(Some(request)),
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding unparseable saved request");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Persist the generation request
    pub async fn set_request(&self, request: &GenerationRequest) -> Result<()> {
        let json = serde_json::to_string(request)?;
        self.set_raw(KEY_REQUEST, &json).await
    }

    /// Look up a cached download for `(format, task)`
    pub async fn get_cached_file(
        &self,
        format: ExportFormat,
        task_id: &TaskId,
    ) -> Result<Option<FlashcardFile>> {
        match self.get_raw(&cache_key(format, task_id)).await? {
            Some(json) => {
                let stored: StoredFlashcardFile = serde_json::from_str(&json)?;
                Ok(Some(stored.decode()?))
            }
            None => Ok(None),
        }
    }

    /// Cache a download under `(format, task)` for repeat downloads
    pub async fn put_cached_file(
        &self,
        format: ExportFormat,
        task_id: &TaskId,
        file: &FlashcardFile,
    ) -> Result<()> {
        let stored = StoredFlashcardFile::from(file);
        let json = serde_json::to_string(&stored)?;
        self.set_raw(&cache_key(format, task_id), &json).await
    }

    /// Drop every cached download (called on "start over")
    pub async fn clear_cached_files(&self) -> Result<()> {
        sqlx::query("DELETE FROM session_state WHERE key LIKE 'csv%' OR key LIKE 'apkg%'")
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM session_state WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.db)
                .await?;
        Ok(row.map(|(value,)| value))
    }

    async fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO session_state (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

fn cache_key(format: ExportFormat, task_id: &TaskId) -> String {
    format!("{}{}", format.as_str(), task_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashgen_common::models::{Language, Mode};

    async fn setup_store() -> SessionStore {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        SessionStore::new(pool)
    }

    #[tokio::test]
    async fn step_round_trips() {
        let store = setup_store().await;

        assert_eq!(store.get_step().await.unwrap(), None);

        store.set_step(WorkflowStep::Configure).await.unwrap();
        assert_eq!(
            store.get_step().await.unwrap(),
            Some(WorkflowStep::Configure)
        );

        store.set_step(WorkflowStep::Wait).await.unwrap();
        assert_eq!(store.get_step().await.unwrap(), Some(WorkflowStep::Wait));
    }

    #[tokio::test]
    async fn unrecognized_saved_step_reads_as_none() {
        let store = setup_store().await;

        sqlx::query("INSERT INTO session_state (key, value) VALUES ('savedStep', 'DOWNLOAD')")
            .execute(&store.db)
            .await
            .unwrap();

        assert_eq!(store.get_step().await.unwrap(), None);
    }

    #[tokio::test]
    async fn request_round_trips() {
        let store = setup_store().await;

        let request = GenerationRequest {
            lang: Some(Language::German),
            mode: Some(Mode::OpenEnded),
            export_format: Some(ExportFormat::Apkg),
            input_text: "some notes".to_string(),
        };
        store.set_request(&request).await.unwrap();

        assert_eq!(store.get_request().await.unwrap(), Some(request));
    }

    #[tokio::test]
    async fn corrupt_saved_request_reads_as_none() {
        let store = setup_store().await;

        sqlx::query(
            "INSERT INTO session_state (key, value) VALUES ('savedGeneratorTaskDto', '{not json')",
        )
        .execute(&store.db)
        .await
        .unwrap();

        assert_eq!(store.get_request().await.unwrap(), None);
    }

    #[tokio::test]
    async fn cached_files_keyed_by_format_and_task() {
        let store = setup_store().await;
        let task = TaskId::new("task-1");
        let file = FlashcardFile {
            filename: "flashcards.csv".to_string(),
            bytes: b"front,back\n".to_vec(),
        };

        store
            .put_cached_file(ExportFormat::Csv, &task, &file)
            .await
            .unwrap();

        assert_eq!(
            store
                .get_cached_file(ExportFormat::Csv, &task)
                .await
                .unwrap(),
            Some(file)
        );
        // Different format, same task: separate cache slot
        assert_eq!(
            store
                .get_cached_file(ExportFormat::Apkg, &task)
                .await
                .unwrap(),
            None
        );

        store.clear_cached_files().await.unwrap();
        assert_eq!(
            store
                .get_cached_file(ExportFormat::Csv, &task)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn clearing_cache_keeps_step_and_request() {
        let store = setup_store().await;

        store.set_step(WorkflowStep::Complete).await.unwrap();
        store.clear_cached_files().await.unwrap();

        assert_eq!(
            store.get_step().await.unwrap(),
            Some(WorkflowStep::Complete)
        );
    }
}
