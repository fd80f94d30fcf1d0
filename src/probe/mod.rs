//! Smoke probes
//!
//! A smoke test is shallow on purpose: one HTTP GET against the published
//! port and one look at the container's process list. Probe failures are
//! reported as data so the stage can fail cleanly; only runtime trouble
//! (engine unreachable, container gone) surfaces as an error.

use crate::core::{BuildVariant, GantryConfig};
use crate::runtime::{ContainerRuntime, RuntimeError};
use regex::Regex;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Error types for probe operations
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("container '{0}' is not running")]
    NotRunning(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Outcome of both probes against one test container
#[derive(Debug, Clone)]
pub struct SmokeReport {
    /// Container that was probed
    pub container: String,

    /// URL the HTTP probe hit
    pub url: String,

    /// HTTP status, None if the request never completed
    pub http_status: Option<u16>,

    /// Whether the expected process showed up in the process list
    pub process_ok: bool,

    /// Process the report looked for
    pub expected_process: &'static str,
}

impl SmokeReport {
    /// A smoke test passes only when the probe saw HTTP 200 and the
    /// expected process is listed
    pub fn passed(&self) -> bool {
        self.http_status == Some(200) && self.process_ok
    }

    /// One-line summary for stage output
    pub fn summary(&self) -> String {
        let http = match self.http_status {
            Some(status) => format!("HTTP {} from {}", status, self.url),
            None => format!("no HTTP response from {}", self.url),
        };
        let process = if self.process_ok {
            format!("{} running", self.expected_process)
        } else {
            format!("{} not found in process list", self.expected_process)
        };
        format!("{}; {}", http, process)
    }
}

/// Run both probes against the variant's test container
pub async fn smoke_test(
    runtime: &dyn ContainerRuntime,
    variant: BuildVariant,
    config: &GantryConfig,
) -> Result<SmokeReport, ProbeError> {
    let container = variant.container_name(config);

    if !runtime.container_running(&container).await? {
        return Err(ProbeError::NotRunning(container));
    }

    let url = variant.probe_url(config);
    let http_status = match http_probe(&url, Duration::from_secs(config.probe_timeout_secs)).await
    {
        Ok(status) => {
            debug!("probe {} returned HTTP {}", url, status);
            Some(status)
        }
        Err(e) => {
            warn!("http probe against {} failed: {}", url, e);
            None
        }
    };

    let top = runtime.container_processes(&container).await?;
    let process_ok = process_listed(&top, variant.expected_process());

    Ok(SmokeReport {
        container,
        url,
        http_status,
        process_ok,
        expected_process: variant.expected_process(),
    })
}

/// GET the URL and return the status code
pub async fn http_probe(url: &str, timeout: Duration) -> Result<u16, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client.get(url).send().await?;
    Ok(response.status().as_u16())
}

/// Check a `docker top` listing for a process name
///
/// Matches the bare program name anywhere in a command line (absolute
/// paths included) without matching substrings of longer names.
pub fn process_listed(top_output: &str, process: &str) -> bool {
    let pattern = format!(r"(?m)(^|[/\s]){}([\s:]|$)", regex::escape(process));
    match Regex::new(&pattern) {
        Ok(regex) => regex.is_match(top_output),
        // Unreachable for the fixed process names; fall back to substring
        Err(_) => top_output.contains(process),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NGINX_TOP: &str = "\
UID    PID    PPID   C   STIME   TTY   TIME       CMD
root   1      0      0   10:00   ?     00:00:00   nginx: master process nginx -g daemon off;
nginx  29     1      0   10:00   ?     00:00:00   nginx: worker process";

    const NODE_TOP: &str = "\
UID    PID    PPID   C   STIME   TTY   TIME       CMD
node   1      0      0   10:00   ?     00:00:02   /usr/local/bin/node /app/node_modules/.bin/react-scripts start";

    #[test]
    fn test_process_listed_matches_nginx_master() {
        assert!(process_listed(NGINX_TOP, "nginx"));
        assert!(!process_listed(NGINX_TOP, "node"));
    }

    #[test]
    fn test_process_listed_matches_absolute_path() {
        assert!(process_listed(NODE_TOP, "node"));
    }

    #[test]
    fn test_process_listed_rejects_substrings() {
        // "node_modules" in a path must not satisfy a "node" check alone
        let top = "UID PID CMD\nroot 1 /app/node_modules/.bin/serve";
        assert!(!process_listed(top, "node"));
    }

    #[test]
    fn test_report_passes_only_on_200_and_process() {
        let mut report = SmokeReport {
            container: "webapp-prod-smoke".to_string(),
            url: "http://127.0.0.1:8080/".to_string(),
            http_status: Some(200),
            process_ok: true,
            expected_process: "nginx",
        };
        assert!(report.passed());

        report.http_status = Some(502);
        assert!(!report.passed());

        report.http_status = Some(200);
        report.process_ok = false;
        assert!(!report.passed());

        report.http_status = None;
        assert!(!report.passed());
    }

    #[test]
    fn test_report_summary_mentions_both_probes() {
        let report = SmokeReport {
            container: "webapp-dev-smoke".to_string(),
            url: "http://127.0.0.1:3000/".to_string(),
            http_status: Some(200),
            process_ok: true,
            expected_process: "node",
        };
        let summary = report.summary();
        assert!(summary.contains("HTTP 200"));
        assert!(summary.contains("node running"));
    }
}
