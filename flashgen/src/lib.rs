//! flashgen library interface
//!
//! Orchestration layer for the flashcard generation workflow: the session
//! store, the backend task client, the generation lifecycle controller, and
//! the presenter consumed by view layers.

pub mod db;
pub mod presenter;
pub mod services;

pub use crate::db::state::SessionStore;
pub use crate::presenter::{ViewState, WorkflowPresenter};
pub use crate::services::generation_controller::{ControllerSnapshot, GenerationController};
pub use crate::services::task_client::{HttpTaskClient, TaskApi};
