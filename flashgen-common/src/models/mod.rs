//! Data model for the generation workflow
//!
//! Wire values of the option and state enums are part of the backend API
//! contract and must not be changed.

pub mod request;
pub mod step;
pub mod task;

pub use request::{ExportFormat, GenerationRequest, Language, Mode};
pub use step::WorkflowStep;
pub use task::{FlashcardFile, StoredFlashcardFile, TaskId, TaskProgress, TaskState};
