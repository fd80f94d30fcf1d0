//! Core domain models for gantry
//!
//! This module defines the fundamental data structures: the tool
//! configuration, the two build variants, and the fixed stage lists that
//! make up each pipeline.

pub mod config;
pub mod pipeline;
pub mod stage;
pub mod state;
pub mod variant;

pub use config::GantryConfig;
pub use pipeline::{Branch, Pipeline, StageSet};
pub use stage::{Stage, StageKind};
pub use state::{PipelineState, RunStatus, StageState};
pub use variant::BuildVariant;
