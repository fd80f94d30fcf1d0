//! Main execution engine - walks a pipeline's stage sets in order

use crate::{
    core::{Branch, GantryConfig, Pipeline, RunStatus, Stage, StageSet, StageState},
    execution::{StageExecutor, StageResult},
    runtime::ContainerRuntime,
    tools::NpmClient,
};
use chrono::Utc;
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during a pipeline run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        run_id: Uuid,
        pipeline_name: String,
    },
    StageStarted {
        stage_id: String,
        name: String,
    },
    StageCompleted {
        stage_id: String,
        detail: String,
    },
    StageFailed {
        stage_id: String,
        error: String,
    },
    StageSkipped {
        stage_id: String,
        reason: String,
    },
    BranchStarted {
        branch: String,
    },
    PipelineCompleted {
        run_id: Uuid,
        status: RunStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Pipeline execution engine
///
/// Sets run strictly in order. Within a parallel set the branches run
/// concurrently and are joined: all of them finish before the next set
/// starts, matching the one parallel block the pipelines declare.
pub struct ExecutionEngine<R> {
    executor: StageExecutor<R>,
    config: GantryConfig,
    handlers: Vec<EventHandler>,
}

impl<R: ContainerRuntime> ExecutionEngine<R> {
    pub fn new(runtime: R, config: GantryConfig) -> Self {
        let npm = NpmClient::new(config.npm_path.clone());
        Self {
            executor: StageExecutor::new(runtime, npm),
            config,
            handlers: Vec::new(),
        }
    }

    /// Register an event handler; call before `execute`
    pub fn with_event_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.handlers.push(Arc::new(handler));
        self
    }

    fn emit(&self, event: ExecutionEvent) {
        for handler in &self.handlers {
            handler(event.clone());
        }
    }

    /// Execute the entire pipeline
    pub async fn execute(&self, pipeline: &mut Pipeline) -> Result<(), String> {
        let run_id = pipeline.state.run_id;
        info!("starting pipeline {} ({})", pipeline.name, run_id);
        self.emit(ExecutionEvent::PipelineStarted {
            run_id,
            pipeline_name: pipeline.name.clone(),
        });

        pipeline.state.start(pipeline.total_stages());

        let mut failure: Option<String> = None;
        for index in 0..pipeline.sets.len() {
            let result = {
                let set = &mut pipeline.sets[index];
                self.run_set(set).await
            };
            pipeline.refresh_counts();

            if let Err(e) = result {
                // Shell `set -e` semantics: first hard failure aborts the
                // run and everything still pending is skipped.
                pipeline.skip_pending("earlier stage failed");
                pipeline.refresh_counts();
                failure = Some(e);
                break;
            }
        }

        let status = if let Some(error) = failure {
            pipeline.state.fail();
            error!("pipeline {} failed: {}", pipeline.name, error);
            self.emit(ExecutionEvent::PipelineCompleted {
                run_id,
                status: RunStatus::Failed,
            });
            return Err(error);
        } else {
            pipeline.state.complete();
            RunStatus::Completed
        };

        info!("pipeline {} finished: {:?}", pipeline.name, status);
        self.emit(ExecutionEvent::PipelineCompleted { run_id, status });

        Ok(())
    }

    async fn run_set(&self, set: &mut StageSet) -> Result<(), String> {
        match set {
            StageSet::Single(stage) => self.run_stage(stage).await,
            StageSet::Parallel { name, branches } => {
                info!("running parallel set: {}", name);
                let branch_runs: Vec<_> = branches
                    .iter_mut()
                    .map(|branch| self.run_branch(branch))
                    .collect();

                // Join semantics: every branch runs to completion before
                // the verdict, even if a sibling already failed.
                let errors: Vec<String> = join_all(branch_runs)
                    .await
                    .into_iter()
                    .filter_map(Result::err)
                    .collect();

                if errors.is_empty() {
                    Ok(())
                } else {
                    Err(errors.join("; "))
                }
            }
        }
    }

    async fn run_branch(&self, branch: &mut Branch) -> Result<(), String> {
        self.emit(ExecutionEvent::BranchStarted {
            branch: branch.name.clone(),
        });

        let mut failure: Option<String> = None;
        for stage in &mut branch.stages {
            if failure.is_some() {
                stage.state = StageState::Skipped {
                    reason: "earlier stage failed".to_string(),
                };
                self.emit(ExecutionEvent::StageSkipped {
                    stage_id: stage.id.clone(),
                    reason: "earlier stage failed".to_string(),
                });
                continue;
            }

            if let Err(e) = self.run_stage(stage).await {
                failure = Some(e);
            }
        }

        match failure {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    async fn run_stage(&self, stage: &mut Stage) -> Result<(), String> {
        let started_at = Utc::now();
        stage.state = StageState::Running { started_at };
        self.emit(ExecutionEvent::StageStarted {
            stage_id: stage.id.clone(),
            name: stage.name.clone(),
        });

        match self.executor.execute(stage, &self.config).await {
            StageResult::Success { detail } => {
                stage.state = StageState::Completed {
                    detail: detail.clone(),
                    started_at,
                    completed_at: Utc::now(),
                };
                self.emit(ExecutionEvent::StageCompleted {
                    stage_id: stage.id.clone(),
                    detail,
                });
                Ok(())
            }
            StageResult::Failed { error } => {
                if stage.best_effort {
                    // `|| true` semantics: log and move on.
                    warn!("best-effort stage {} failed: {}", stage.id, error);
                    stage.state = StageState::Skipped {
                        reason: error.clone(),
                    };
                    self.emit(ExecutionEvent::StageSkipped {
                        stage_id: stage.id.clone(),
                        reason: error,
                    });
                    Ok(())
                } else {
                    stage.state = StageState::Failed {
                        error: error.clone(),
                        started_at,
                        failed_at: Utc::now(),
                    };
                    self.emit(ExecutionEvent::StageFailed {
                        stage_id: stage.id.clone(),
                        error: error.clone(),
                    });
                    Err(format!("stage {} failed: {}", stage.id, error))
                }
            }
        }
    }
}
