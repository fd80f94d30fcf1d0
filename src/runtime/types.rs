//! Container runtime types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for container runtime operations
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("'{command}' timed out after {timeout_secs} seconds")]
    Timeout { command: String, timeout_secs: u64 },

    #[error("could not decode output of '{command}': {source}")]
    Decode {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// One tagged image as reported by the engine's image listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// repository:tag reference
    pub reference: String,

    /// Human-readable size as reported by the engine
    pub size: String,

    /// Human-readable age as reported by the engine
    pub created: String,
}

/// Everything needed to start a detached test container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Image tag to run
    pub image: String,

    /// Container name
    pub name: String,

    /// Host port to publish
    pub host_port: u16,

    /// Container port the runtime listens on
    pub container_port: u16,
}

impl ContainerSpec {
    /// The `-p host:container` publish argument
    pub fn publish_arg(&self) -> String {
        format!("{}:{}", self.host_port, self.container_port)
    }
}

/// Parse `docker images` output formatted as reference\tsize\tcreated
pub fn parse_image_lines(output: &str) -> Vec<ImageRecord> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let reference = fields.next()?.trim();
            let size = fields.next()?.trim();
            let created = fields.next().unwrap_or("").trim();
            if reference.is_empty() || reference.contains("<none>") {
                return None;
            }
            Some(ImageRecord {
                reference: reference.to_string(),
                size: size.to_string(),
                created: created.to_string(),
            })
        })
        .collect()
}
