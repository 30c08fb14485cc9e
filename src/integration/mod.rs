//! Integration layer wiring the subsystems into one pipeline
//!
//! The [`Orchestrator`] owns the intent and ranging workers plus the
//! speech manager, routes commands and events between them, and keeps the
//! [`SharedPipelineState`] current. Callers hold an [`OrchestratorHandle`]
//! and read state through snapshots.

pub mod config;
pub mod orchestrator;
pub mod state;

pub use config::OrchestratorConfig;
pub use orchestrator::{Orchestrator, OrchestratorCommand, OrchestratorHandle};
pub use state::{PipelineSnapshot, PipelineState, SharedPipelineState};
