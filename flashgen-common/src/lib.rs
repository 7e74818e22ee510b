//! Shared vocabulary for the flashgen workspace
//!
//! Error taxonomy, configuration, and the data model exchanged between the
//! generation controller, the task client, and the session store.

pub mod config;
pub mod error;
pub mod models;

pub use crate::config::GeneratorConfig;
pub use crate::error::{Error, Result};
