//! Stage domain model
//!
//! A stage is one named, ordered step of a pipeline. The set of operations
//! is closed: every pipeline is assembled from the fixed kinds below.

use crate::core::state::StageState;
use crate::core::variant::BuildVariant;
use serde::{Deserialize, Serialize};

/// The operation a stage performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageKind {
    /// `npm install` in the build context
    InstallDeps,
    /// `npm run build` in the build context
    BuildBundle,
    /// Build the variant's image target and move its latest tag
    BuildImage(BuildVariant),
    /// Remove any stale test container, then start a fresh one
    StartContainer(BuildVariant),
    /// Fixed startup window before probing
    AwaitStartup(BuildVariant),
    /// HTTP probe plus process-list check
    SmokeTest(BuildVariant),
    /// Stop and remove the test container
    RemoveTestContainer(BuildVariant),
    /// Push the numbered tag to the configured registry
    PushImage(BuildVariant),
    /// Remove dangling images left behind by rebuilds
    RemoveDanglingImages,
}

impl StageKind {
    /// The variant this stage operates on, if any
    pub fn variant(&self) -> Option<BuildVariant> {
        match self {
            StageKind::BuildImage(v)
            | StageKind::StartContainer(v)
            | StageKind::AwaitStartup(v)
            | StageKind::SmokeTest(v)
            | StageKind::RemoveTestContainer(v)
            | StageKind::PushImage(v) => Some(*v),
            StageKind::InstallDeps | StageKind::BuildBundle | StageKind::RemoveDanglingImages => {
                None
            }
        }
    }

    fn id_base(&self) -> &'static str {
        match self {
            StageKind::InstallDeps => "install-deps",
            StageKind::BuildBundle => "build-bundle",
            StageKind::BuildImage(_) => "build-image",
            StageKind::StartContainer(_) => "start-container",
            StageKind::AwaitStartup(_) => "await-startup",
            StageKind::SmokeTest(_) => "smoke-test",
            StageKind::RemoveTestContainer(_) => "remove-container",
            StageKind::PushImage(_) => "push-image",
            StageKind::RemoveDanglingImages => "remove-dangling",
        }
    }

    fn name_base(&self) -> String {
        match self {
            StageKind::InstallDeps => "Install dependencies".to_string(),
            StageKind::BuildBundle => "Build bundle".to_string(),
            StageKind::BuildImage(v) => format!("Build {} image", v),
            StageKind::StartContainer(v) => format!("Start {} container", v),
            StageKind::AwaitStartup(v) => format!("Await {} startup", v),
            StageKind::SmokeTest(v) => format!("Smoke test {}", v),
            StageKind::RemoveTestContainer(v) => format!("Remove {} container", v),
            StageKind::PushImage(v) => format!("Push {} image", v),
            StageKind::RemoveDanglingImages => "Remove dangling images".to_string(),
        }
    }

    /// Upper bound on the stage's wall-clock time, in seconds
    pub fn default_timeout_secs(&self) -> u64 {
        match self {
            StageKind::InstallDeps => 600,
            StageKind::BuildBundle => 600,
            StageKind::BuildImage(_) => 900,
            StageKind::StartContainer(_) => 60,
            // The sleep itself is bounded by the configured wait; this
            // guards against a stalled runtime, not the sleep.
            StageKind::AwaitStartup(_) => 120,
            StageKind::SmokeTest(_) => 60,
            StageKind::RemoveTestContainer(_) => 60,
            StageKind::PushImage(_) => 300,
            StageKind::RemoveDanglingImages => 120,
        }
    }

    /// Whether a failure of this stage is swallowed instead of aborting
    /// the run, shell `|| true` style
    pub fn is_best_effort(&self) -> bool {
        matches!(
            self,
            StageKind::RemoveTestContainer(_) | StageKind::RemoveDanglingImages
        )
    }
}

/// A single stage in a pipeline
#[derive(Debug, Clone)]
pub struct Stage {
    /// Unique stage identifier within the pipeline
    pub id: String,

    /// Human-readable stage name
    pub name: String,

    /// Operation performed by this stage
    pub kind: StageKind,

    /// Failures are logged and swallowed instead of aborting the run
    pub best_effort: bool,

    /// Timeout in seconds
    pub timeout_secs: u64,

    /// Runtime state
    pub state: StageState,
}

impl Stage {
    /// Create a stage with the kind's derived id, name, and timeout
    pub fn new(kind: StageKind) -> Self {
        let id = match kind.variant() {
            Some(v) => format!("{}-{}", kind.id_base(), v.short()),
            None => kind.id_base().to_string(),
        };

        Stage {
            id,
            name: kind.name_base(),
            kind,
            best_effort: kind.is_best_effort(),
            timeout_secs: kind.default_timeout_secs(),
            state: StageState::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_ids_carry_variant() {
        let stage = Stage::new(StageKind::BuildImage(BuildVariant::Production));
        assert_eq!(stage.id, "build-image-prod");
        assert_eq!(stage.name, "Build production image");

        let stage = Stage::new(StageKind::SmokeTest(BuildVariant::Development));
        assert_eq!(stage.id, "smoke-test-dev");
    }

    #[test]
    fn test_variantless_stage_ids() {
        let stage = Stage::new(StageKind::InstallDeps);
        assert_eq!(stage.id, "install-deps");
        assert!(stage.kind.variant().is_none());
    }

    #[test]
    fn test_teardown_stages_are_best_effort() {
        assert!(Stage::new(StageKind::RemoveTestContainer(BuildVariant::Production)).best_effort);
        assert!(Stage::new(StageKind::RemoveDanglingImages).best_effort);
        assert!(!Stage::new(StageKind::SmokeTest(BuildVariant::Production)).best_effort);
        assert!(!Stage::new(StageKind::BuildImage(BuildVariant::Development)).best_effort);
    }

    #[test]
    fn test_new_stage_is_pending() {
        let stage = Stage::new(StageKind::BuildBundle);
        assert!(matches!(stage.state, StageState::Pending));
        assert_eq!(stage.timeout_secs, 600);
    }
}
