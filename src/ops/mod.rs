//! Direct commands that bypass the pipeline engine
//!
//! sizes, cleanup, and compose are single fixed sequences of runtime
//! calls; wrapping them in a pipeline would add nothing. The functions
//! return data and leave rendering to the binary.

use crate::core::{BuildVariant, GantryConfig};
use crate::runtime::{ContainerRuntime, ImageRecord, RuntimeError};
use std::path::PathBuf;
use tracing::{debug, warn};

/// What the cleanup pass managed to tear down
#[derive(Debug, Clone, Default)]
pub struct CleanupSummary {
    /// Containers that were running and got stopped
    pub stopped: Vec<String>,

    /// Containers that were removed
    pub removed: Vec<String>,

    /// Compose files that were brought down
    pub compose_downed: Vec<PathBuf>,

    /// Dangling images removed
    pub dangling_removed: usize,

    /// Containers still running afterwards; should always be empty
    pub still_running: Vec<String>,
}

/// Tagged images for the configured repository
pub async fn sizes<R: ContainerRuntime>(
    runtime: &R,
    config: &GantryConfig,
) -> Result<Vec<ImageRecord>, RuntimeError> {
    runtime.list_images(&config.image).await
}

/// Best-effort teardown of everything the test cycles may leave behind
///
/// Every step tolerates "already absent"; nothing here can fail the
/// command.
pub async fn cleanup<R: ContainerRuntime>(runtime: &R, config: &GantryConfig) -> CleanupSummary {
    let mut summary = CleanupSummary::default();

    for variant in BuildVariant::all() {
        let name = variant.container_name(config);

        match runtime.stop_container(&name).await {
            Ok(()) => summary.stopped.push(name.clone()),
            Err(e) => debug!("{} was not running: {}", name, e),
        }
        match runtime.remove_container(&name).await {
            Ok(()) => summary.removed.push(name.clone()),
            Err(e) => debug!("{} already removed: {}", name, e),
        }

        let compose_file = variant.compose_file(config);
        if compose_file.exists() {
            match runtime.compose_down(compose_file).await {
                Ok(()) => summary.compose_downed.push(compose_file.to_path_buf()),
                Err(e) => debug!("compose stack {} was not up: {}", compose_file.display(), e),
            }
        }
    }

    match runtime.remove_dangling_images().await {
        Ok(removed) => summary.dangling_removed = removed,
        Err(e) => warn!("could not remove dangling images: {}", e),
    }

    // Confirm nothing is left listening
    for variant in BuildVariant::all() {
        let name = variant.container_name(config);
        if let Ok(true) = runtime.container_running(&name).await {
            warn!("{} is still running after cleanup", name);
            summary.still_running.push(name);
        }
    }

    summary
}

/// Bring a variant's compose file up, detached
pub async fn compose_up<R: ContainerRuntime>(
    runtime: &R,
    variant: BuildVariant,
    config: &GantryConfig,
) -> Result<(), RuntimeError> {
    runtime.compose_up(variant.compose_file(config)).await
}
