//! Docker CLI subprocess runtime

use crate::runtime::types::{parse_image_lines, ContainerSpec, ImageRecord, RuntimeError};
use crate::runtime::{compose, ContainerRuntime};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Generous upper bound covering image builds; shorter operations are
/// additionally bounded by their stage timeout.
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 900;

/// Container runtime that shells out to the docker binary
#[derive(Debug, Clone)]
pub struct DockerCli {
    /// Path to the docker executable
    docker_path: String,

    /// Timeout for a single docker invocation in seconds
    timeout_secs: u64,
}

impl DockerCli {
    /// Create a new docker CLI runtime
    ///
    /// # Arguments
    /// * `docker_path` - Path to the docker executable (e.g. "docker")
    /// * `timeout_secs` - Timeout for a single invocation in seconds
    pub fn new(docker_path: String, timeout_secs: u64) -> Self {
        Self {
            docker_path,
            timeout_secs,
        }
    }

    /// Runtime using the configured docker path and the default timeout
    pub fn with_path(docker_path: String) -> Self {
        Self::new(docker_path, DEFAULT_COMMAND_TIMEOUT_SECS)
    }

    /// Get the docker executable path
    #[cfg(test)]
    pub fn docker_path(&self) -> &str {
        &self.docker_path
    }

    /// Run a docker invocation and capture stdout
    ///
    /// # Errors
    /// Returns `RuntimeError` if:
    /// - The docker executable cannot be spawned
    /// - docker exits with a non-zero status
    /// - The output is not valid UTF-8
    /// - The command times out
    async fn run(&self, args: Vec<String>) -> Result<String, RuntimeError> {
        let command_display = format!("{} {}", self.docker_path, args.join(" "));
        debug!("running: {}", command_display);

        let timeout_duration = Duration::from_secs(self.timeout_secs);

        let result = timeout(
            timeout_duration,
            Command::new(&self.docker_path)
                .args(&args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| RuntimeError::Timeout {
            command: command_display.clone(),
            timeout_secs: self.timeout_secs,
        })?;

        let output = result.map_err(|e| RuntimeError::Spawn {
            command: command_display.clone(),
            source: e,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output.status.code().unwrap_or(-1);
            warn!("{} exited with code {}: {}", command_display, code, stderr.trim());
            return Err(RuntimeError::CommandFailed {
                command: command_display,
                code,
                stderr: stderr.trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|e| RuntimeError::Decode {
            command: command_display.clone(),
            source: e,
        })?;

        debug!("{} returned {} bytes", command_display, stdout.len());

        Ok(stdout)
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn build_image(
        &self,
        context: &Path,
        dockerfile: &Path,
        target: &str,
        tag: &str,
    ) -> Result<(), RuntimeError> {
        self.run(vec![
            "build".to_string(),
            "--target".to_string(),
            target.to_string(),
            "-t".to_string(),
            tag.to_string(),
            "-f".to_string(),
            dockerfile.display().to_string(),
            context.display().to_string(),
        ])
        .await?;
        Ok(())
    }

    async fn tag_image(&self, source: &str, target: &str) -> Result<(), RuntimeError> {
        self.run(vec![
            "tag".to_string(),
            source.to_string(),
            target.to_string(),
        ])
        .await?;
        Ok(())
    }

    async fn run_detached(&self, spec: &ContainerSpec) -> Result<(), RuntimeError> {
        self.run(vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            spec.name.clone(),
            "-p".to_string(),
            spec.publish_arg(),
            spec.image.clone(),
        ])
        .await?;
        Ok(())
    }

    async fn stop_container(&self, name: &str) -> Result<(), RuntimeError> {
        self.run(vec!["stop".to_string(), name.to_string()]).await?;
        Ok(())
    }

    async fn remove_container(&self, name: &str) -> Result<(), RuntimeError> {
        self.run(vec!["rm".to_string(), "-f".to_string(), name.to_string()])
            .await?;
        Ok(())
    }

    async fn container_running(&self, name: &str) -> Result<bool, RuntimeError> {
        let stdout = self
            .run(vec![
                "ps".to_string(),
                "--filter".to_string(),
                format!("name=^{}$", name),
                "--format".to_string(),
                "{{.Names}}".to_string(),
            ])
            .await?;
        Ok(stdout.lines().any(|line| line.trim() == name))
    }

    async fn container_processes(&self, name: &str) -> Result<String, RuntimeError> {
        self.run(vec!["top".to_string(), name.to_string()]).await
    }

    async fn list_images(&self, repository: &str) -> Result<Vec<ImageRecord>, RuntimeError> {
        let stdout = self
            .run(vec![
                "images".to_string(),
                "--format".to_string(),
                "{{.Repository}}:{{.Tag}}\t{{.Size}}\t{{.CreatedSince}}".to_string(),
                repository.to_string(),
            ])
            .await?;
        Ok(parse_image_lines(&stdout))
    }

    async fn remove_dangling_images(&self) -> Result<usize, RuntimeError> {
        let stdout = self
            .run(vec![
                "images".to_string(),
                "-f".to_string(),
                "dangling=true".to_string(),
                "-q".to_string(),
            ])
            .await?;

        let mut removed = 0;
        for id in stdout.lines().map(str::trim).filter(|id| !id.is_empty()) {
            // An id can be in use by a running container; skip it rather
            // than failing the whole sweep.
            match self.run(vec!["rmi".to_string(), id.to_string()]).await {
                Ok(_) => removed += 1,
                Err(e) => warn!("could not remove dangling image {}: {}", id, e),
            }
        }
        Ok(removed)
    }

    async fn push_image(&self, reference: &str) -> Result<(), RuntimeError> {
        self.run(vec!["push".to_string(), reference.to_string()])
            .await?;
        Ok(())
    }

    async fn compose_up(&self, file: &Path) -> Result<(), RuntimeError> {
        self.run(compose::up_args(file)).await?;
        Ok(())
    }

    async fn compose_down(&self, file: &Path) -> Result<(), RuntimeError> {
        self.run(compose::down_args(file)).await?;
        Ok(())
    }
}
