//! Generation task lifecycle controller
//!
//! Owns the workflow state machine, the adaptive polling loop, and
//! cancellation coordination.
//!
//! # State Progression
//! UPLOAD_TEXT → CONFIGURE → WAIT → COMPLETE (reset returns to UPLOAD_TEXT)
//!
//! # Concurrency
//! All state lives behind one async mutex; the polling loop runs as a single
//! spawned task per submission and is stopped through a `CancellationToken`.
//! The token is checked before each poll fires and again before a fetched
//! response is applied, so a cancel during an outstanding poll suppresses
//! the late response instead of racing it. At most one poll is in flight:
//! the next is scheduled only after the previous response is handled.

use crate::db::state::SessionStore;
use crate::services::task_client::TaskApi;
use chrono::{DateTime, Utc};
use flashgen_common::models::{
    ExportFormat, FlashcardFile, GenerationRequest, Language, Mode, TaskId, TaskProgress,
    TaskState, WorkflowStep,
};
use flashgen_common::{Error, GeneratorConfig, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Mutable controller state, guarded by one mutex
struct ControllerState {
    step: WorkflowStep,
    request: GenerationRequest,
    progress: TaskProgress,
    task_id: Option<TaskId>,
    poll_token: Option<CancellationToken>,
    last_error: Option<String>,
    submitted_at: Option<DateTime<Utc>>,
}

impl ControllerState {
    fn new() -> Self {
        Self {
            step: WorkflowStep::UploadText,
            request: GenerationRequest::default(),
            progress: TaskProgress::default(),
            task_id: None,
            poll_token: None,
            last_error: None,
            submitted_at: None,
        }
    }

    fn export_format(&self) -> Option<ExportFormat> {
        self.request.export_format
    }
}

/// Immutable view of the controller state, consumed by the presenter
#[derive(Debug, Clone)]
pub struct ControllerSnapshot {
    pub step: WorkflowStep,
    pub request: GenerationRequest,
    pub progress: TaskProgress,
    pub task_id: Option<TaskId>,
    pub last_error: Option<String>,
}

impl ControllerSnapshot {
    /// A restored `Wait` step with no task: the process restarted while
    /// polling and the in-flight task is gone. The only way forward is a
    /// cancel (which skips the backend call) back to the upload step.
    pub fn is_stale_wait(&self) -> bool {
        self.step == WorkflowStep::Wait && self.task_id.is_none()
    }
}

/// Generation task lifecycle controller
///
/// One instance per active session; no globals.
pub struct GenerationController {
    session_id: Uuid,
    config: GeneratorConfig,
    client: Arc<dyn TaskApi>,
    store: SessionStore,
    state: Arc<Mutex<ControllerState>>,
}

impl GenerationController {
    pub fn new(config: GeneratorConfig, client: Arc<dyn TaskApi>, store: SessionStore) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            config,
            client,
            store,
            state: Arc::new(Mutex::new(ControllerState::new())),
        }
    }

    /// Restore step and request from the session store
    ///
    /// Task id and progress are ephemeral and never restored; a saved `Wait`
    /// step therefore comes back as a stale wait (see
    /// [`ControllerSnapshot::is_stale_wait`]).
    pub async fn initialize(&self) -> Result<()> {
        let saved_step = self.store.get_step().await?;
        let saved_request = self.store.get_request().await?;

        let mut state = self.state.lock().await;
        state.step = saved_step.unwrap_or(WorkflowStep::UploadText);
        state.request = saved_request.unwrap_or_default();

        tracing::info!(
            session_id = %self.session_id,
            step = %state.step,
            text_length = state.request.input_text.chars().count(),
            "Controller initialized from session store"
        );

        Ok(())
    }

    /// Current state view for the presenter
    pub async fn snapshot(&self) -> ControllerSnapshot {
        let state = self.state.lock().await;
        ControllerSnapshot {
            step: state.step,
            request: state.request.clone(),
            progress: state.progress.clone(),
            task_id: state.task_id.clone(),
            last_error: state.last_error.clone(),
        }
    }

    /// Replace the input text (UploadText/Configure only); write-through
    pub async fn set_input_text(&self, text: impl Into<String>) -> Result<()> {
        self.mutate_request(|request| request.input_text = text.into())
            .await
    }

    /// Choose the flashcard language; write-through
    pub async fn set_language(&self, lang: Language) -> Result<()> {
        self.mutate_request(|request| request.lang = Some(lang)).await
    }

    /// Choose the generation mode; write-through
    pub async fn set_mode(&self, mode: Mode) -> Result<()> {
        self.mutate_request(|request| request.mode = Some(mode)).await
    }

    /// Choose the export format; write-through
    pub async fn set_export_format(&self, format: ExportFormat) -> Result<()> {
        self.mutate_request(|request| request.export_format = Some(format))
            .await
    }

    async fn mutate_request(&self, f: impl FnOnce(&mut GenerationRequest)) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.step.allows_request_edits() {
            return Err(Error::InvalidTransition {
                step: state.step.to_string(),
                action: "edit request",
            });
        }
        f(&mut state.request);
        self.store.set_request(&state.request).await
    }

    /// UploadText → Configure, when the input text length is in range
    pub async fn advance(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.step != WorkflowStep::UploadText {
            return Err(Error::InvalidTransition {
                step: state.step.to_string(),
                action: "advance",
            });
        }
        if !state.request.text_in_range(&self.config) {
            return Err(Error::InvalidInput(format!(
                "Input text length {} outside ({}, {}]",
                state.request.input_text.chars().count(),
                self.config.min_text_length,
                self.config.max_text_length
            )));
        }
        self.transition(&mut state, WorkflowStep::Configure).await
    }

    /// One step back; always permitted, never errors
    ///
    /// From `Wait` this cancels the in-flight task first.
    pub async fn go_back(&self) -> Result<()> {
        let step = {
            let state = self.state.lock().await;
            state.step
        };
        match step {
            WorkflowStep::Configure => {
                let mut state = self.state.lock().await;
                // Re-check under the lock; a concurrent transition wins
                if state.step == WorkflowStep::Configure {
                    self.transition(&mut state, WorkflowStep::UploadText).await?;
                }
                Ok(())
            }
            WorkflowStep::Wait => self.cancel().await,
            other => {
                tracing::debug!(session_id = %self.session_id, step = %other, "go_back is a no-op here");
                Ok(())
            }
        }
    }

    /// Submit the request and begin polling (Configure only)
    ///
    /// On submission failure the step stays at Configure so the user's input
    /// is not lost; resubmission is an explicit user action.
    pub async fn start_generation(&self) -> Result<TaskId> {
        let request = {
            let state = self.state.lock().await;
            if state.step != WorkflowStep::Configure {
                return Err(Error::InvalidTransition {
                    step: state.step.to_string(),
                    action: "start generation",
                });
            }
            if !state.request.is_complete(&self.config) {
                return Err(Error::InvalidInput(
                    "Generation request is incomplete".to_string(),
                ));
            }
            // Frozen at submission time
            state.request.clone()
        };

        match self.client.submit(&request).await {
            Ok(task_id) => {
                let token = CancellationToken::new();
                let mut state = self.state.lock().await;
                state.task_id = Some(task_id.clone());
                state.progress = TaskProgress::default();
                state.last_error = None;
                state.submitted_at = Some(Utc::now());
                state.poll_token = Some(token.clone());
                self.transition(&mut state, WorkflowStep::Wait).await?;
                drop(state);

                tracing::info!(
                    session_id = %self.session_id,
                    task_id = %task_id,
                    "Generation task submitted, polling started"
                );

                self.spawn_polling(task_id.clone(), token);
                Ok(task_id)
            }
            Err(e) => {
                tracing::error!(
                    session_id = %self.session_id,
                    error = %e,
                    "Generation task submission failed"
                );
                let mut state = self.state.lock().await;
                state.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Cancel the in-flight task and return to UploadText (Wait only)
    ///
    /// Polling is marked inactive before anything else, so an
    /// already-in-flight poll becomes a no-op. The backend cancel call is
    /// best effort: its failure is logged, never escalated, since local
    /// state wins once the user asks to cancel.
    pub async fn cancel(&self) -> Result<()> {
        let (token, task_id) = {
            let mut state = self.state.lock().await;
            if state.step != WorkflowStep::Wait {
                return Err(Error::InvalidTransition {
                    step: state.step.to_string(),
                    action: "cancel",
                });
            }
            (state.poll_token.take(), state.task_id.take())
        };

        if let Some(token) = token {
            token.cancel();
        }

        match &task_id {
            Some(task_id) => {
                if let Err(e) = self.client.cancel(task_id).await {
                    tracing::warn!(
                        session_id = %self.session_id,
                        task_id = %task_id,
                        error = %e,
                        "Backend cancel failed; proceeding locally"
                    );
                }
            }
            // Stale wait after a restart: no task to cancel remotely
            None => {
                tracing::info!(
                    session_id = %self.session_id,
                    "Cancelling stale wait with no in-flight task"
                );
            }
        }

        let mut state = self.state.lock().await;
        state.progress = TaskProgress::default();
        state.last_error = None;
        state.submitted_at = None;
        self.transition(&mut state, WorkflowStep::UploadText).await?;

        tracing::info!(session_id = %self.session_id, task_id = ?task_id, "Generation cancelled");
        Ok(())
    }

    /// Resolve the generated file (Complete only)
    ///
    /// Repeat downloads for the same `(exportFormat, taskId)` pair are served
    /// from the store cache without touching the backend.
    pub async fn download_result(&self) -> Result<FlashcardFile> {
        let (task_id, format, retrieval_token) = {
            let state = self.state.lock().await;
            if state.step != WorkflowStep::Complete {
                return Err(Error::InvalidTransition {
                    step: state.step.to_string(),
                    action: "download",
                });
            }
            let task_id = state
                .task_id
                .clone()
                .ok_or_else(|| Error::InvalidInput("No completed task".to_string()))?;
            let format = state
                .export_format()
                .ok_or_else(|| Error::InvalidInput("No export format chosen".to_string()))?;
            (task_id, format, state.progress.retrieval_token.clone())
        };

        if let Some(file) = self.store.get_cached_file(format, &task_id).await? {
            tracing::debug!(
                session_id = %self.session_id,
                task_id = %task_id,
                format = %format,
                "Download served from cache"
            );
            return Ok(file);
        }

        let retrieval_token = retrieval_token.ok_or_else(|| {
            Error::Protocol("retrievalToken is missing for a completed task".to_string())
        })?;

        let file = self.client.fetch_result(&retrieval_token, format).await?;
        self.store.put_cached_file(format, &task_id, &file).await?;

        tracing::info!(
            session_id = %self.session_id,
            task_id = %task_id,
            filename = %file.filename,
            "Download fetched and cached"
        );
        Ok(file)
    }

    /// Start over (Complete only): empty request, cleared caches, UploadText
    pub async fn reset(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.step != WorkflowStep::Complete {
            return Err(Error::InvalidTransition {
                step: state.step.to_string(),
                action: "reset",
            });
        }

        state.request = GenerationRequest::default();
        self.store.set_request(&state.request).await?;
        self.store.clear_cached_files().await?;

        state.task_id = None;
        state.progress = TaskProgress::default();
        state.last_error = None;
        state.submitted_at = None;
        self.transition(&mut state, WorkflowStep::UploadText).await?;

        tracing::info!(session_id = %self.session_id, "Workflow reset");
        Ok(())
    }

    /// Write-through step transition
    async fn transition(&self, state: &mut ControllerState, to: WorkflowStep) -> Result<()> {
        let from = state.step;
        state.step = to;
        self.store.set_step(to).await?;
        tracing::debug!(
            session_id = %self.session_id,
            from = %from,
            to = %to,
            "Workflow step transition"
        );
        Ok(())
    }

    fn spawn_polling(&self, task_id: TaskId, token: CancellationToken) {
        let session_id = self.session_id;
        let config = self.config.clone();
        let client = Arc::clone(&self.client);
        let store = self.store.clone();
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            poll_until_terminal(session_id, config, client, store, state, task_id, token).await;
        });
    }
}

/// The polling loop
///
/// Sleeps the current adaptive delay, checks for cancellation, fetches task
/// info, checks again, then applies the response. Transport faults are
/// logged and retried on the next tick; the loop only stops on a terminal
/// task state, a protocol violation, or cancellation.
async fn poll_until_terminal(
    session_id: Uuid,
    config: GeneratorConfig,
    client: Arc<dyn TaskApi>,
    store: SessionStore,
    state: Arc<Mutex<ControllerState>>,
    task_id: TaskId,
    token: CancellationToken,
) {
    let mut delay = config.poll_delay_long();

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!(session_id = %session_id, task_id = %task_id, "Polling stopped by cancellation");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        let info = match client.fetch_info(&task_id).await {
            Ok(info) => info,
            Err(e) if e.is_transport() => {
                // Transient fault: keep the loop alive at the current interval
                tracing::warn!(
                    session_id = %session_id,
                    task_id = %task_id,
                    error = %e,
                    "Poll failed; retrying on next tick"
                );
                continue;
            }
            Err(e) => {
                tracing::error!(
                    session_id = %session_id,
                    task_id = %task_id,
                    error = %e,
                    "Poll response violated the job API contract; polling stopped"
                );
                let mut state = state.lock().await;
                if !token.is_cancelled() {
                    state.last_error = Some(e.to_string());
                }
                return;
            }
        };

        let mut state = state.lock().await;

        // A cancel issued while this poll was in flight wins: discard the
        // late response without touching controller state.
        if token.is_cancelled() {
            tracing::debug!(
                session_id = %session_id,
                task_id = %task_id,
                "Discarding poll response received after cancellation"
            );
            return;
        }

        state.progress = info.clone();

        match info.task_state {
            TaskState::Success => {
                if info.retrieval_token.is_none() {
                    // Contract violation: SUCCESS must carry a retrieval
                    // token. Fail loudly, hold the step.
                    let e = Error::Protocol(
                        "retrievalToken is missing from a SUCCESS response".to_string(),
                    );
                    tracing::error!(
                        session_id = %session_id,
                        task_id = %task_id,
                        error = %e,
                        "Task reported success without a retrieval token"
                    );
                    state.last_error = Some(e.to_string());
                    return;
                }

                state.step = WorkflowStep::Complete;
                state.poll_token = None;
                if let Err(e) = store.set_step(WorkflowStep::Complete).await {
                    tracing::error!(session_id = %session_id, error = %e, "Failed to persist step");
                }

                let elapsed_seconds = state
                    .submitted_at
                    .map(|t| (Utc::now() - t).num_seconds())
                    .unwrap_or_default();
                tracing::info!(
                    session_id = %session_id,
                    task_id = %task_id,
                    elapsed_seconds,
                    "Generation task completed"
                );
                return;
            }
            TaskState::Failure | TaskState::Revoked => {
                // Legitimate terminal outcome. Surface it and stay on Wait:
                // the user sees the failure before deciding to cancel/back.
                let e = Error::TaskFailed(info.task_state.to_string());
                tracing::error!(
                    session_id = %session_id,
                    task_id = %task_id,
                    state = %info.task_state,
                    "Generation task failed"
                );
                state.last_error = Some(e.to_string());
                state.task_id = None;
                state.poll_token = None;
                return;
            }
            TaskState::InProgress => {
                // Work confirmed running: poll tighter so a quick completion
                // is not missed
                delay = config.poll_delay_short();
            }
            TaskState::Pending | TaskState::Started | TaskState::Retry => {
                delay = config.poll_delay_long();
            }
        }

        tracing::debug!(
            session_id = %session_id,
            task_id = %task_id,
            state = %info.task_state,
            current_batch = ?info.current_batch,
            total_batches = ?info.total_batches,
            "Task progress"
        );
    }
}
