//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall pipeline run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run has not started
    Pending,
    /// Run is in progress
    Running,
    /// All stages finished green (skipped best-effort stages count as green)
    Completed,
    /// A stage failed and the run aborted
    Failed,
}

/// State of a single stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageState {
    /// Stage has not run yet
    Pending,
    /// Stage is currently executing
    Running { started_at: DateTime<Utc> },
    /// Stage finished successfully
    Completed {
        detail: String,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },
    /// Stage failed and aborted the run
    Failed {
        error: String,
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
    },
    /// Stage did not run: either an earlier stage failed, or this stage
    /// is best-effort and its failure was swallowed
    Skipped { reason: String },
}

impl StageState {
    /// Check if the stage is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StageState::Completed { .. } | StageState::Failed { .. } | StageState::Skipped { .. }
        )
    }

    /// Check if the stage counts against the run (Failed only)
    pub fn is_failure(&self) -> bool {
        matches!(self, StageState::Failed { .. })
    }
}

/// Overall pipeline run state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Unique run ID
    pub run_id: Uuid,

    /// Current run status
    pub status: RunStatus,

    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// When the run completed or failed
    pub completed_at: Option<DateTime<Utc>>,

    /// Total number of stages
    pub total_stages: usize,

    /// Number of completed stages
    pub completed_stages: usize,

    /// Number of failed stages
    pub failed_stages: usize,

    /// Number of skipped stages
    pub skipped_stages: usize,
}

impl PipelineState {
    /// Create a new pipeline run state
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: RunStatus::Pending,
            started_at: None,
            completed_at: None,
            total_stages: 0,
            completed_stages: 0,
            failed_stages: 0,
            skipped_stages: 0,
        }
    }

    /// Mark the run as started
    pub fn start(&mut self, total_stages: usize) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
        self.total_stages = total_stages;
    }

    /// Mark the run as completed
    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Mark the run as failed
    pub fn fail(&mut self) {
        self.status = RunStatus::Failed;
        self.completed_at = Some(Utc::now());
    }

    /// Update stage counts
    pub fn update_counts(&mut self, completed: usize, failed: usize, skipped: usize) {
        self.completed_stages = completed;
        self.failed_stages = failed;
        self.skipped_stages = skipped;
    }

    /// Progress fraction (0.0 to 1.0) over terminal stages
    pub fn progress(&self) -> f64 {
        if self.total_stages == 0 {
            return 0.0;
        }
        (self.completed_stages + self.failed_stages + self.skipped_stages) as f64
            / self.total_stages as f64
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_state_is_terminal() {
        assert!(!StageState::Pending.is_terminal());
        assert!(!StageState::Running {
            started_at: Utc::now()
        }
        .is_terminal());
        assert!(StageState::Completed {
            detail: "ok".to_string(),
            started_at: Utc::now(),
            completed_at: Utc::now(),
        }
        .is_terminal());
        assert!(StageState::Failed {
            error: "boom".to_string(),
            started_at: Utc::now(),
            failed_at: Utc::now(),
        }
        .is_terminal());
        assert!(StageState::Skipped {
            reason: "earlier stage failed".to_string()
        }
        .is_terminal());
    }

    #[test]
    fn test_only_failed_counts_as_failure() {
        assert!(StageState::Failed {
            error: "boom".to_string(),
            started_at: Utc::now(),
            failed_at: Utc::now(),
        }
        .is_failure());
        assert!(!StageState::Skipped {
            reason: "best effort".to_string()
        }
        .is_failure());
    }

    #[test]
    fn test_run_progress() {
        let mut state = PipelineState::new();
        state.start(4);
        assert_eq!(state.progress(), 0.0);

        state.update_counts(2, 0, 0);
        assert_eq!(state.progress(), 0.5);

        state.update_counts(3, 0, 1);
        assert_eq!(state.progress(), 1.0);
    }
}
