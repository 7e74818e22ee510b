//! Backend task state, progress reports, and download results

use crate::{Error, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Opaque backend task identifier
///
/// Returned on submission; lives for one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend task state as reported by the job API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Started,
    InProgress,
    Success,
    Failure,
    Retry,
    Revoked,
}

impl TaskState {
    /// Wire string for this state
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "PENDING",
            TaskState::Started => "STARTED",
            TaskState::InProgress => "IN_PROGRESS",
            TaskState::Success => "SUCCESS",
            TaskState::Failure => "FAILURE",
            TaskState::Retry => "RETRY",
            TaskState::Revoked => "REVOKED",
        }
    }

    /// Terminal states stop the polling loop
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Success | TaskState::Failure | TaskState::Revoked
        )
    }

    /// States polled at the long (idle) interval
    pub fn is_idle(&self) -> bool {
        matches!(
            self,
            TaskState::Pending | TaskState::Started | TaskState::Retry
        )
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task progress report from the poll endpoint
///
/// Ephemeral: never persisted across restarts. A restart while polling
/// loses the in-flight task; the controller detects the resulting stale
/// wait and lets the user cancel out of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskProgress {
    pub task_state: TaskState,
    pub current_batch: Option<u32>,
    pub total_batches: Option<u32>,
    pub retrieval_token: Option<String>,
}

impl Default for TaskProgress {
    fn default() -> Self {
        Self {
            task_state: TaskState::Pending,
            current_batch: None,
            total_batches: None,
            retrieval_token: None,
        }
    }
}

impl TaskProgress {
    /// Percentage complete (0.0 - 100.0) when the backend has reported
    /// batch counts, `None` before that
    pub fn percent_complete(&self) -> Option<f64> {
        match (self.current_batch, self.total_batches) {
            (Some(current), Some(total)) if total > 0 => {
                Some((current as f64 / total as f64) * 100.0)
            }
            _ => None,
        }
    }
}

/// Downloaded flashcard file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Storage form of a downloaded file: bytes as base64 so the whole record
/// fits in one TEXT column of the session store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFlashcardFile {
    pub filename: String,
    pub data_base64: String,
}

impl From<&FlashcardFile> for StoredFlashcardFile {
    fn from(file: &FlashcardFile) -> Self {
        Self {
            filename: file.filename.clone(),
            data_base64: base64::engine::general_purpose::STANDARD.encode(&file.bytes),
        }
    }
}

impl StoredFlashcardFile {
    /// Decode back into the in-memory form
    pub fn decode(&self) -> Result<FlashcardFile> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&self.data_base64)
            .map_err(|e| Error::Protocol(format!("Corrupt cached file: {}", e)))?;
        Ok(FlashcardFile {
            filename: self.filename.clone(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_state_wire_names() {
        assert_eq!(
            serde_json::to_string(&TaskState::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
        let state: TaskState = serde_json::from_str("\"REVOKED\"").unwrap();
        assert_eq!(state, TaskState::Revoked);
    }

    #[test]
    fn terminal_and_idle_classification() {
        assert!(TaskState::Success.is_terminal());
        assert!(TaskState::Failure.is_terminal());
        assert!(TaskState::Revoked.is_terminal());
        assert!(!TaskState::InProgress.is_terminal());

        assert!(TaskState::Pending.is_idle());
        assert!(TaskState::Retry.is_idle());
        assert!(!TaskState::InProgress.is_idle());
    }

    #[test]
    fn progress_parses_partial_payload() {
        let progress: TaskProgress = serde_json::from_str(r#"{"taskState":"PENDING"}"#).unwrap();
        assert_eq!(progress.task_state, TaskState::Pending);
        assert_eq!(progress.current_batch, None);
        assert_eq!(progress.percent_complete(), None);
    }

    #[test]
    fn percent_complete_from_batches() {
        let progress = TaskProgress {
            task_state: TaskState::InProgress,
            current_batch: Some(3),
            total_batches: Some(4),
            retrieval_token: None,
        };
        assert_eq!(progress.percent_complete(), Some(75.0));
    }

    #[test]
    fn stored_file_round_trips() {
        let file = FlashcardFile {
            filename: "flashcards.apkg".to_string(),
            bytes: vec![0x50, 0x4b, 0x03, 0x04],
        };
        let stored = StoredFlashcardFile::from(&file);
        assert_eq!(stored.decode().unwrap(), file);
    }
}
