//! Pipeline execution engine

pub mod engine;
pub mod executor;

pub use engine::{EventHandler, ExecutionEngine, ExecutionEvent};
pub use executor::{StageExecutor, StageResult};
