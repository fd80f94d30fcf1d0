//! gantry - local container build/test/cleanup cycles for a web app

pub mod cli;
pub mod core;
pub mod execution;
pub mod ops;
pub mod probe;
pub mod runtime;
pub mod tools;

// Re-export commonly used types
pub use self::core::{BuildVariant, GantryConfig, Pipeline, RunStatus, Stage, StageKind, StageState};
pub use execution::{ExecutionEngine, ExecutionEvent};
pub use probe::SmokeReport;
pub use runtime::{ContainerRuntime, DockerCli, ImageRecord, RuntimeError};
