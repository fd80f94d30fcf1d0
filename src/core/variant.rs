//! Build variant domain model
//!
//! The two image variants share one Dockerfile and differ only in the
//! build target, the port the runtime listens on, and the process that
//! should be serving inside the container.

use crate::core::config::GantryConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A named build target of the multi-stage image build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildVariant {
    /// Static bundle served by nginx
    Production,
    /// Dev server with hot reload
    Development,
}

impl BuildVariant {
    /// Both variants, in the order the parallel pipeline branches run them
    pub fn all() -> [BuildVariant; 2] {
        [BuildVariant::Production, BuildVariant::Development]
    }

    /// Build target name inside the Dockerfile
    pub fn target(&self) -> &'static str {
        match self {
            BuildVariant::Production => "production",
            BuildVariant::Development => "development",
        }
    }

    /// Short name used in tags, container names, and stage ids
    pub fn short(&self) -> &'static str {
        match self {
            BuildVariant::Production => "prod",
            BuildVariant::Development => "dev",
        }
    }

    /// Port the runtime listens on inside the container
    pub fn container_port(&self) -> u16 {
        match self {
            BuildVariant::Production => 80,
            BuildVariant::Development => 3000,
        }
    }

    /// Host port the test container maps to
    pub fn host_port(&self, config: &GantryConfig) -> u16 {
        match self {
            BuildVariant::Production => config.prod_host_port,
            BuildVariant::Development => config.dev_host_port,
        }
    }

    /// Process expected in the container's process list once it is serving
    pub fn expected_process(&self) -> &'static str {
        match self {
            BuildVariant::Production => "nginx",
            BuildVariant::Development => "node",
        }
    }

    /// Fixed name of the throwaway smoke-test container
    pub fn container_name(&self, config: &GantryConfig) -> String {
        format!("{}-{}-smoke", config.image, self.short())
    }

    /// Numbered image tag for this build
    pub fn build_tag(&self, config: &GantryConfig) -> String {
        format!("{}:{}-{}", config.image, self.short(), config.build_number)
    }

    /// Moving tag pointing at the most recent build of this variant
    pub fn latest_tag(&self, config: &GantryConfig) -> String {
        format!("{}:{}-latest", config.image, self.short())
    }

    /// Registry-qualified tag, if a registry is configured
    pub fn remote_tag(&self, config: &GantryConfig) -> Option<String> {
        config
            .registry
            .as_ref()
            .map(|registry| format!("{}/{}", registry, self.build_tag(config)))
    }

    /// URL the HTTP smoke probe hits
    pub fn probe_url(&self, config: &GantryConfig) -> String {
        format!("http://127.0.0.1:{}/", self.host_port(config))
    }

    /// Compose file driving this variant
    pub fn compose_file<'a>(&self, config: &'a GantryConfig) -> &'a Path {
        match self {
            BuildVariant::Production => &config.compose_prod_file,
            BuildVariant::Development => &config.compose_dev_file,
        }
    }
}

impl fmt::Display for BuildVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.target())
    }
}
