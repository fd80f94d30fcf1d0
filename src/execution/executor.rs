//! Stage executor - maps a stage to runtime, probe, and npm calls

use crate::{
    core::{GantryConfig, Stage, StageKind},
    probe,
    runtime::{ContainerRuntime, ContainerSpec},
    tools::NpmClient,
};
use anyhow::Result;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, error, info};

/// Result of executing a single stage
#[derive(Debug, Clone)]
pub enum StageResult {
    /// Stage finished; detail is a one-line summary for output
    Success { detail: String },
    /// Stage failed; whether that aborts the run is the engine's call
    Failed { error: String },
}

/// Executes a single stage against the container runtime and host tools
pub struct StageExecutor<R> {
    runtime: R,
    npm: NpmClient,
}

impl<R: ContainerRuntime> StageExecutor<R> {
    pub fn new(runtime: R, npm: NpmClient) -> Self {
        Self { runtime, npm }
    }

    /// Borrow the underlying runtime (for direct commands like sizes)
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Execute a stage and return the result
    pub async fn execute(&self, stage: &Stage, config: &GantryConfig) -> StageResult {
        info!("executing stage: {}", stage.id);

        // The await stage sleeps for the configured window; make sure its
        // timeout can never undercut that.
        let timeout_secs = match stage.kind {
            StageKind::AwaitStartup(_) => stage.timeout_secs.max(config.startup_wait_secs + 10),
            _ => stage.timeout_secs,
        };

        match timeout(
            Duration::from_secs(timeout_secs),
            self.dispatch(&stage.kind, config),
        )
        .await
        {
            Ok(Ok(detail)) => {
                debug!("stage {} done: {}", stage.id, detail);
                StageResult::Success { detail }
            }
            Ok(Err(e)) => {
                error!("stage {} failed: {:#}", stage.id, e);
                StageResult::Failed {
                    error: format!("{:#}", e),
                }
            }
            Err(_) => {
                error!("stage {} timed out after {}s", stage.id, timeout_secs);
                StageResult::Failed {
                    error: format!("timed out after {} seconds", timeout_secs),
                }
            }
        }
    }

    async fn dispatch(&self, kind: &StageKind, config: &GantryConfig) -> Result<String> {
        match kind {
            StageKind::InstallDeps => {
                self.npm.install(&config.context_dir).await?;
                Ok("dependencies installed".to_string())
            }

            StageKind::BuildBundle => {
                self.npm.build(&config.context_dir).await?;
                Ok("bundle built".to_string())
            }

            StageKind::BuildImage(variant) => {
                let tag = variant.build_tag(config);
                self.runtime
                    .build_image(&config.context_dir, &config.dockerfile, variant.target(), &tag)
                    .await?;
                let latest = variant.latest_tag(config);
                self.runtime.tag_image(&tag, &latest).await?;
                Ok(format!("built {}, {} now points at it", tag, latest))
            }

            StageKind::StartContainer(variant) => {
                let name = variant.container_name(config);
                // Pair every start with a remove so re-runs never collide
                // on the fixed container name.
                if let Err(e) = self.runtime.remove_container(&name).await {
                    debug!("no stale container to remove: {}", e);
                }

                let spec = ContainerSpec {
                    image: variant.build_tag(config),
                    name: name.clone(),
                    host_port: variant.host_port(config),
                    container_port: variant.container_port(),
                };
                self.runtime.run_detached(&spec).await?;
                Ok(format!("{} listening on host port {}", name, spec.host_port))
            }

            StageKind::AwaitStartup(variant) => {
                sleep(Duration::from_secs(config.startup_wait_secs)).await;
                Ok(format!(
                    "waited {}s for {}",
                    config.startup_wait_secs,
                    variant.container_name(config)
                ))
            }

            StageKind::SmokeTest(variant) => {
                let report = probe::smoke_test(&self.runtime, *variant, config).await?;
                if report.passed() {
                    Ok(report.summary())
                } else {
                    anyhow::bail!("smoke test failed: {}", report.summary())
                }
            }

            StageKind::RemoveTestContainer(variant) => {
                let name = variant.container_name(config);
                if let Err(e) = self.runtime.stop_container(&name).await {
                    debug!("stop {}: {}", name, e);
                }
                self.runtime.remove_container(&name).await?;
                Ok(format!("{} stopped and removed", name))
            }

            StageKind::PushImage(variant) => {
                let remote = variant
                    .remote_tag(config)
                    .ok_or_else(|| anyhow::anyhow!("no registry configured"))?;
                self.runtime
                    .tag_image(&variant.build_tag(config), &remote)
                    .await?;
                self.runtime.push_image(&remote).await?;
                Ok(format!("pushed {}", remote))
            }

            StageKind::RemoveDanglingImages => {
                let removed = self.runtime.remove_dangling_images().await?;
                Ok(format!("removed {} dangling image(s)", removed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BuildVariant, Stage};
    use crate::runtime::DockerCli;

    fn broken_executor() -> StageExecutor<DockerCli> {
        // A docker path that cannot be spawned turns every runtime call
        // into a deterministic failure without needing an engine.
        StageExecutor::new(
            DockerCli::new("nonexistent-docker-binary".to_string(), 5),
            NpmClient::new("nonexistent-npm-binary".to_string()),
        )
    }

    #[tokio::test]
    async fn test_build_failure_maps_to_failed_result() {
        let executor = broken_executor();
        let config = GantryConfig::default();
        let stage = Stage::new(StageKind::BuildImage(BuildVariant::Production));

        let result = executor.execute(&stage, &config).await;
        match result {
            StageResult::Failed { error } => {
                assert!(error.contains("nonexistent-docker-binary"), "got: {}", error)
            }
            StageResult::Success { .. } => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_install_failure_maps_to_failed_result() {
        let executor = broken_executor();
        let config = GantryConfig::default();
        let stage = Stage::new(StageKind::InstallDeps);

        let result = executor.execute(&stage, &config).await;
        assert!(matches!(result, StageResult::Failed { .. }));
    }

    #[tokio::test]
    async fn test_await_startup_succeeds_without_runtime() {
        let executor = broken_executor();
        let config = GantryConfig {
            startup_wait_secs: 1,
            ..Default::default()
        };
        let stage = Stage::new(StageKind::AwaitStartup(BuildVariant::Development));

        let result = executor.execute(&stage, &config).await;
        match result {
            StageResult::Success { detail } => assert!(detail.contains("waited 1s")),
            StageResult::Failed { error } => panic!("expected success, got {}", error),
        }
    }
}
