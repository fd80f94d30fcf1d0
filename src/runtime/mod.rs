//! Container runtime seam
//!
//! Everything that touches the container engine goes through the
//! [`ContainerRuntime`] trait so pipelines can be exercised against a mock
//! in tests. The only production implementation shells out to the docker
//! binary.

pub mod compose;
pub mod docker_cli;
pub mod types;

use async_trait::async_trait;
use std::path::Path;

pub use docker_cli::DockerCli;
pub use types::{parse_image_lines, ContainerSpec, ImageRecord, RuntimeError};

/// Operations gantry needs from a container engine
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Build a named target of the Dockerfile and tag the result
    async fn build_image(
        &self,
        context: &Path,
        dockerfile: &Path,
        target: &str,
        tag: &str,
    ) -> Result<(), RuntimeError>;

    /// Point an additional tag at an existing image
    async fn tag_image(&self, source: &str, target: &str) -> Result<(), RuntimeError>;

    /// Start a detached container with a published port
    async fn run_detached(&self, spec: &ContainerSpec) -> Result<(), RuntimeError>;

    /// Stop a running container
    async fn stop_container(&self, name: &str) -> Result<(), RuntimeError>;

    /// Force-remove a container, running or not
    async fn remove_container(&self, name: &str) -> Result<(), RuntimeError>;

    /// Check whether a container with exactly this name is running
    async fn container_running(&self, name: &str) -> Result<bool, RuntimeError>;

    /// Process listing of a running container (`docker top`)
    async fn container_processes(&self, name: &str) -> Result<String, RuntimeError>;

    /// Tagged images for a repository
    async fn list_images(&self, repository: &str) -> Result<Vec<ImageRecord>, RuntimeError>;

    /// Remove dangling images; returns how many were removed
    async fn remove_dangling_images(&self) -> Result<usize, RuntimeError>;

    /// Push a fully qualified reference to its registry
    async fn push_image(&self, reference: &str) -> Result<(), RuntimeError>;

    /// Bring a compose file up, detached
    async fn compose_up(&self, file: &Path) -> Result<(), RuntimeError>;

    /// Bring a compose file down
    async fn compose_down(&self, file: &Path) -> Result<(), RuntimeError>;
}
