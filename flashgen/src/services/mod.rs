//! Services for flashgen
//!
//! The backend task client and the generation lifecycle controller.

pub mod generation_controller;
pub mod task_client;

pub use generation_controller::GenerationController;
pub use task_client::{HttpTaskClient, TaskApi};
