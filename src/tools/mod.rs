//! Host toolchain: presence checks and npm invocations

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

const VERSION_CHECK_TIMEOUT_SECS: u64 = 15;
const NPM_TIMEOUT_SECS: u64 = 600;

/// Error types for host tool invocations
#[derive(Debug, Error)]
pub enum ToolError {
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
}

/// Presence and version of one required tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolReport {
    /// Display name, e.g. "docker compose"
    pub name: String,

    /// First line of the version output, if the tool responded
    pub version: Option<String>,

    /// Whether gantry can work at all without this tool
    pub required: bool,
}

impl ToolReport {
    /// Tool answered its version probe
    pub fn installed(&self) -> bool {
        self.version.is_some()
    }
}

/// Probe the host toolchain the way the setup scripts did: check, never
/// install
pub async fn doctor(docker_path: &str, npm_path: &str) -> Vec<ToolReport> {
    vec![
        check_tool("docker", docker_path, &["--version"], true).await,
        check_tool("docker compose", docker_path, &["compose", "version"], false).await,
        check_tool("node", "node", &["--version"], false).await,
        check_tool("npm", npm_path, &["--version"], false).await,
    ]
}

/// Probe one tool by asking for its version
async fn check_tool(name: &str, program: &str, args: &[&str], required: bool) -> ToolReport {
    let version = match run_command(program, args, None, VERSION_CHECK_TIMEOUT_SECS).await {
        Ok(stdout) => stdout.lines().next().map(|line| line.trim().to_string()),
        Err(e) => {
            debug!("{} version probe failed: {}", name, e);
            None
        }
    };

    ToolReport {
        name: name.to_string(),
        version,
        required,
    }
}

/// npm invocations for the ci pipeline
#[derive(Debug, Clone)]
pub struct NpmClient {
    /// Path to the npm executable
    npm_path: String,
}

impl NpmClient {
    /// Create a new npm client
    pub fn new(npm_path: String) -> Self {
        Self { npm_path }
    }

    /// `npm install` in the build context
    pub async fn install(&self, context_dir: &Path) -> Result<(), ToolError> {
        run_command(
            &self.npm_path,
            &["install"],
            Some(context_dir),
            NPM_TIMEOUT_SECS,
        )
        .await?;
        Ok(())
    }

    /// `npm run build` in the build context
    pub async fn build(&self, context_dir: &Path) -> Result<(), ToolError> {
        run_command(
            &self.npm_path,
            &["run", "build"],
            Some(context_dir),
            NPM_TIMEOUT_SECS,
        )
        .await?;
        Ok(())
    }
}

/// Spawn a host command, bound by a timeout, and capture stdout
async fn run_command(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    timeout_secs: u64,
) -> Result<String, ToolError> {
    let command_display = format!("{} {}", program, args.join(" "));
    debug!("running: {}", command_display);

    let mut command = Command::new(program);
    command.args(args).kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let result = timeout(Duration::from_secs(timeout_secs), command.output())
        .await
        .map_err(|_| ToolError::Timeout {
            command: command_display.clone(),
            timeout_secs,
        })?;

    let output = result.map_err(|e| ToolError::Spawn {
        command: command_display.clone(),
        source: e,
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let code = output.status.code().unwrap_or(-1);
        warn!("{} exited with code {}: {}", command_display, code, stderr.trim());
        return Err(ToolError::CommandFailed {
            command: command_display,
            code,
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_report_installed() {
        let report = ToolReport {
            name: "docker".to_string(),
            version: Some("Docker version 27.0.3".to_string()),
            required: true,
        };
        assert!(report.installed());

        let missing = ToolReport {
            name: "node".to_string(),
            version: None,
            required: false,
        };
        assert!(!missing.installed());
    }

    #[tokio::test]
    async fn test_missing_tool_reports_none() {
        let report = check_tool(
            "definitely-missing",
            "definitely-missing-binary",
            &["--version"],
            false,
        )
        .await;
        assert!(!report.installed());
    }

    #[tokio::test]
    async fn test_spawn_failure_is_typed() {
        let npm = NpmClient::new("nonexistent-npm-binary".to_string());
        let result = npm.install(Path::new(".")).await;
        assert!(matches!(result, Err(ToolError::Spawn { .. })));
    }
}
