//! Workflow presenter
//!
//! Maps controller snapshots onto one of four view states and re-exposes
//! the user actions, so view layers never read controller internals.

use crate::services::generation_controller::{ControllerSnapshot, GenerationController};
use flashgen_common::models::{
    ExportFormat, FlashcardFile, GenerationRequest, Language, Mode, TaskId, TaskState,
};
use flashgen_common::{GeneratorConfig, Result};
use std::sync::Arc;

/// What the view layer should render
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    /// Text entry: current text, its length, and whether advancing is allowed
    UploadText {
        input_text: String,
        text_length: usize,
        can_advance: bool,
    },
    /// Option selection: the request so far and whether generation may start
    Configure {
        request: GenerationRequest,
        can_generate: bool,
    },
    /// Waiting on the backend task
    Wait {
        task_state: TaskState,
        current_batch: Option<u32>,
        total_batches: Option<u32>,
        /// 0.0 - 100.0 once batch counts are known
        percent_complete: Option<f64>,
        /// True when a restart lost the in-flight task; only cancel helps
        stale: bool,
        error: Option<String>,
    },
    /// Result ready for download
    Complete {
        export_format: Option<ExportFormat>,
        filename_hint: Option<String>,
    },
}

/// Presenter over a shared controller
#[derive(Clone)]
pub struct WorkflowPresenter {
    controller: Arc<GenerationController>,
    config: GeneratorConfig,
}

impl WorkflowPresenter {
    pub fn new(controller: Arc<GenerationController>, config: GeneratorConfig) -> Self {
        Self { controller, config }
    }

    /// Current view state
    pub async fn view(&self) -> ViewState {
        let snapshot = self.controller.snapshot().await;
        self.map(snapshot)
    }

    fn map(&self, snapshot: ControllerSnapshot) -> ViewState {
        use flashgen_common::models::WorkflowStep;

        match snapshot.step {
            WorkflowStep::UploadText => {
                let text_length = snapshot.request.input_text.chars().count();
                ViewState::UploadText {
                    can_advance: snapshot.request.text_in_range(&self.config),
                    input_text: snapshot.request.input_text,
                    text_length,
                }
            }
            WorkflowStep::Configure => ViewState::Configure {
                can_generate: snapshot.request.is_complete(&self.config),
                request: snapshot.request,
            },
            WorkflowStep::Wait => ViewState::Wait {
                task_state: snapshot.progress.task_state,
                current_batch: snapshot.progress.current_batch,
                total_batches: snapshot.progress.total_batches,
                percent_complete: snapshot.progress.percent_complete(),
                stale: snapshot.is_stale_wait(),
                error: snapshot.last_error,
            },
            WorkflowStep::Complete => ViewState::Complete {
                export_format: snapshot.request.export_format,
                filename_hint: snapshot
                    .request
                    .export_format
                    .map(|f| f.fallback_filename()),
            },
        }
    }

    // Actions, delegated to the controller

    pub async fn set_input_text(&self, text: impl Into<String>) -> Result<()> {
        self.controller.set_input_text(text).await
    }

    pub async fn set_language(&self, lang: Language) -> Result<()> {
        self.controller.set_language(lang).await
    }

    pub async fn set_mode(&self, mode: Mode) -> Result<()> {
        self.controller.set_mode(mode).await
    }

    pub async fn set_export_format(&self, format: ExportFormat) -> Result<()> {
        self.controller.set_export_format(format).await
    }

    pub async fn advance(&self) -> Result<()> {
        self.controller.advance().await
    }

    pub async fn back(&self) -> Result<()> {
        self.controller.go_back().await
    }

    pub async fn generate(&self) -> Result<TaskId> {
        self.controller.start_generation().await
    }

    pub async fn cancel(&self) -> Result<()> {
        self.controller.cancel().await
    }

    pub async fn download(&self) -> Result<FlashcardFile> {
        self.controller.download_result().await
    }

    pub async fn reset(&self) -> Result<()> {
        self.controller.reset().await
    }
}
