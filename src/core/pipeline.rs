//! Pipeline domain model
//!
//! Pipelines here are fixed, ordered stage lists. The only structure beyond
//! a plain sequence is a single parallel set whose branches must all finish
//! before the next set starts. There is no dependency graph to resolve.

use crate::core::{
    config::GantryConfig,
    stage::{Stage, StageKind},
    state::{PipelineState, RunStatus, StageState},
    variant::BuildVariant,
};

/// A named sequential branch inside a parallel set
#[derive(Debug, Clone)]
pub struct Branch {
    /// Branch name (shown in output)
    pub name: String,

    /// Stages executed in order within the branch
    pub stages: Vec<Stage>,
}

/// One entry in a pipeline: a single stage or a parallel block
#[derive(Debug, Clone)]
pub enum StageSet {
    /// One stage, run to completion before the next set
    Single(Stage),
    /// Named branches run concurrently; all must finish before the next set
    Parallel { name: String, branches: Vec<Branch> },
}

/// A pipeline definition plus its run state
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Ordered stage sets
    pub sets: Vec<StageSet>,

    /// Run state
    pub state: PipelineState,
}

impl Pipeline {
    /// The full build/test/teardown cycle for one variant
    pub fn verify(variant: BuildVariant) -> Self {
        Pipeline {
            name: format!("verify-{}", variant.short()),
            sets: Self::verify_stages(variant)
                .into_iter()
                .map(StageSet::Single)
                .collect(),
            state: PipelineState::new(),
        }
    }

    /// Production and development cycles as two parallel branches
    pub fn verify_both() -> Self {
        Pipeline {
            name: "verify-both".to_string(),
            sets: vec![Self::parallel_verify_set()],
            state: PipelineState::new(),
        }
    }

    /// The full CI pipeline: install, bundle, parallel verify branches,
    /// optional pushes, dangling-image cleanup
    pub fn ci(config: &GantryConfig) -> Self {
        let mut sets = vec![
            StageSet::Single(Stage::new(StageKind::InstallDeps)),
            StageSet::Single(Stage::new(StageKind::BuildBundle)),
            Self::parallel_verify_set(),
        ];

        if config.push {
            for variant in BuildVariant::all() {
                sets.push(StageSet::Single(Stage::new(StageKind::PushImage(variant))));
            }
        }

        sets.push(StageSet::Single(Stage::new(StageKind::RemoveDanglingImages)));

        Pipeline {
            name: "ci".to_string(),
            sets,
            state: PipelineState::new(),
        }
    }

    fn parallel_verify_set() -> StageSet {
        StageSet::Parallel {
            name: "verify-images".to_string(),
            branches: BuildVariant::all()
                .into_iter()
                .map(|variant| Branch {
                    name: variant.target().to_string(),
                    stages: Self::verify_stages(variant),
                })
                .collect(),
        }
    }

    fn verify_stages(variant: BuildVariant) -> Vec<Stage> {
        vec![
            Stage::new(StageKind::BuildImage(variant)),
            Stage::new(StageKind::StartContainer(variant)),
            Stage::new(StageKind::AwaitStartup(variant)),
            Stage::new(StageKind::SmokeTest(variant)),
            Stage::new(StageKind::RemoveTestContainer(variant)),
        ]
    }

    /// Total number of stages across all sets and branches
    pub fn total_stages(&self) -> usize {
        self.stages().len()
    }

    /// All stages in declaration order
    pub fn stages(&self) -> Vec<&Stage> {
        let mut stages = Vec::new();
        self.for_each_stage(|stage| stages.push(stage));
        stages
    }

    /// Find a stage by id
    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.sets.iter().find_map(|set| match set {
            StageSet::Single(stage) => (stage.id == id).then_some(stage),
            StageSet::Parallel { branches, .. } => branches
                .iter()
                .flat_map(|b| b.stages.iter())
                .find(|s| s.id == id),
        })
    }

    /// Check if every stage reached a terminal state
    pub fn is_complete(&self) -> bool {
        self.for_each_stage_all(|s| s.state.is_terminal())
    }

    /// Check if the run failed
    pub fn has_failed(&self) -> bool {
        self.state.status == RunStatus::Failed
    }

    /// Mark every still-pending stage as skipped
    pub fn skip_pending(&mut self, reason: &str) {
        self.for_each_stage_mut(|stage| {
            if matches!(stage.state, StageState::Pending) {
                stage.state = StageState::Skipped {
                    reason: reason.to_string(),
                };
            }
        });
    }

    /// Recompute the run-state counts from stage states
    pub fn refresh_counts(&mut self) {
        let mut completed = 0;
        let mut failed = 0;
        let mut skipped = 0;

        self.for_each_stage(|stage| match stage.state {
            StageState::Completed { .. } => completed += 1,
            StageState::Failed { .. } => failed += 1,
            StageState::Skipped { .. } => skipped += 1,
            _ => {}
        });

        self.state.update_counts(completed, failed, skipped);
    }

    fn for_each_stage<'a>(&'a self, mut f: impl FnMut(&'a Stage)) {
        for set in &self.sets {
            match set {
                StageSet::Single(stage) => f(stage),
                StageSet::Parallel { branches, .. } => {
                    for branch in branches {
                        for stage in &branch.stages {
                            f(stage);
                        }
                    }
                }
            }
        }
    }

    fn for_each_stage_all(&self, mut f: impl FnMut(&Stage) -> bool) -> bool {
        let mut all = true;
        self.for_each_stage(|stage| {
            if !f(stage) {
                all = false;
            }
        });
        all
    }

    fn for_each_stage_mut(&mut self, mut f: impl FnMut(&mut Stage)) {
        for set in &mut self.sets {
            match set {
                StageSet::Single(stage) => f(stage),
                StageSet::Parallel { branches, .. } => {
                    for branch in branches {
                        for stage in &mut branch.stages {
                            f(stage);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_is_a_fixed_sequence() {
        let pipeline = Pipeline::verify(BuildVariant::Production);
        let ids: Vec<&str> = pipeline
            .sets
            .iter()
            .map(|set| match set {
                StageSet::Single(stage) => stage.id.as_str(),
                StageSet::Parallel { .. } => panic!("verify has no parallel set"),
            })
            .collect();

        assert_eq!(
            ids,
            vec![
                "build-image-prod",
                "start-container-prod",
                "await-startup-prod",
                "smoke-test-prod",
                "remove-container-prod",
            ]
        );
    }

    #[test]
    fn test_verify_both_has_one_parallel_set_with_two_branches() {
        let pipeline = Pipeline::verify_both();
        assert_eq!(pipeline.sets.len(), 1);

        match &pipeline.sets[0] {
            StageSet::Parallel { branches, .. } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(branches[0].name, "production");
                assert_eq!(branches[1].name, "development");
                assert_eq!(branches[0].stages.len(), 5);
            }
            StageSet::Single(_) => panic!("expected a parallel set"),
        }

        assert_eq!(pipeline.total_stages(), 10);
    }

    #[test]
    fn test_ci_includes_push_only_when_enabled() {
        let mut config = GantryConfig::default();
        let without_push = Pipeline::ci(&config);
        assert!(without_push.stage("push-image-prod").is_none());

        config.push = true;
        config.registry = Some("registry.example.com".to_string());
        let with_push = Pipeline::ci(&config);
        assert!(with_push.stage("push-image-prod").is_some());
        assert!(with_push.stage("push-image-dev").is_some());
        // Cleanup stays the final set either way
        match with_push.sets.last().unwrap() {
            StageSet::Single(stage) => assert_eq!(stage.id, "remove-dangling"),
            StageSet::Parallel { .. } => panic!("last set should be cleanup"),
        }
    }

    #[test]
    fn test_skip_pending_marks_all_pending() {
        let mut pipeline = Pipeline::verify_both();
        pipeline.skip_pending("earlier stage failed");
        assert!(pipeline.is_complete());

        pipeline.refresh_counts();
        assert_eq!(pipeline.state.skipped_stages, 10);
        assert_eq!(pipeline.state.completed_stages, 0);
    }
}
