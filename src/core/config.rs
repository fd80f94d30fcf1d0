//! Tool configuration from defaults, gantry.yaml, and environment

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the optional config file looked up in the working directory
pub const CONFIG_FILE: &str = "gantry.yaml";

/// Resolved configuration for a gantry invocation
///
/// Layered: built-in defaults, then the optional `gantry.yaml`, then
/// environment variables. Environment always wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GantryConfig {
    /// Image repository (un-prefixed, e.g. "webapp")
    #[serde(default = "default_image")]
    pub image: String,

    /// Registry prefix for pushes (e.g. "registry.example.com/team")
    #[serde(default)]
    pub registry: Option<String>,

    /// Build number used in image tags
    #[serde(default = "default_build_number")]
    pub build_number: String,

    /// Docker build context directory
    #[serde(default = "default_context_dir")]
    pub context_dir: PathBuf,

    /// Dockerfile path, relative to the context
    #[serde(default = "default_dockerfile")]
    pub dockerfile: PathBuf,

    /// Host port the production test container maps to
    #[serde(default = "default_prod_port")]
    pub prod_host_port: u16,

    /// Host port the development test container maps to
    #[serde(default = "default_dev_port")]
    pub dev_host_port: u16,

    /// Fixed startup window before the smoke test, in seconds
    #[serde(default = "default_startup_wait")]
    pub startup_wait_secs: u64,

    /// Client timeout for the HTTP probe, in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Whether the ci pipeline pushes images after a green verify
    #[serde(default)]
    pub push: bool,

    /// Compose file for the production variant
    #[serde(default = "default_compose_prod")]
    pub compose_prod_file: PathBuf,

    /// Compose file for the development variant
    #[serde(default = "default_compose_dev")]
    pub compose_dev_file: PathBuf,

    /// Path to the docker executable
    #[serde(default = "default_docker_path")]
    pub docker_path: String,

    /// Path to the npm executable
    #[serde(default = "default_npm_path")]
    pub npm_path: String,
}

fn default_image() -> String {
    "webapp".to_string()
}

fn default_build_number() -> String {
    "0".to_string()
}

fn default_context_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_dockerfile() -> PathBuf {
    PathBuf::from("Dockerfile")
}

fn default_prod_port() -> u16 {
    8080
}

fn default_dev_port() -> u16 {
    3000
}

fn default_startup_wait() -> u64 {
    8
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_compose_prod() -> PathBuf {
    PathBuf::from("docker-compose.yml")
}

fn default_compose_dev() -> PathBuf {
    PathBuf::from("docker-compose.dev.yml")
}

fn default_docker_path() -> String {
    "docker".to_string()
}

fn default_npm_path() -> String {
    "npm".to_string()
}

impl Default for GantryConfig {
    fn default() -> Self {
        Self {
            image: default_image(),
            registry: None,
            build_number: default_build_number(),
            context_dir: default_context_dir(),
            dockerfile: default_dockerfile(),
            prod_host_port: default_prod_port(),
            dev_host_port: default_dev_port(),
            startup_wait_secs: default_startup_wait(),
            probe_timeout_secs: default_probe_timeout(),
            push: false,
            compose_prod_file: default_compose_prod(),
            compose_dev_file: default_compose_dev(),
            docker_path: default_docker_path(),
            npm_path: default_npm_path(),
        }
    }
}

impl GantryConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.as_ref().display()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: GantryConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the layered configuration: defaults, gantry.yaml if present,
    /// then environment overrides
    pub fn load() -> Result<Self> {
        let mut config = if Path::new(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };

        let env: HashMap<String, String> = std::env::vars().collect();
        config.apply_env(&env)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides from a plain map
    ///
    /// Factored over a map instead of reading the process environment so
    /// tests never have to mutate global state.
    pub fn apply_env(&mut self, env: &HashMap<String, String>) -> Result<()> {
        if let Some(v) = env.get("GANTRY_IMAGE") {
            self.image = v.clone();
        }
        if let Some(v) = env.get("GANTRY_REGISTRY") {
            self.registry = Some(v.clone());
        }
        if let Some(v) = env.get("BUILD_NUMBER") {
            self.build_number = v.clone();
        }
        if let Some(v) = env.get("GANTRY_CONTEXT") {
            self.context_dir = PathBuf::from(v);
        }
        if let Some(v) = env.get("GANTRY_DOCKERFILE") {
            self.dockerfile = PathBuf::from(v);
        }
        if let Some(v) = env.get("GANTRY_PROD_PORT") {
            self.prod_host_port = parse_port("GANTRY_PROD_PORT", v)?;
        }
        if let Some(v) = env.get("GANTRY_DEV_PORT") {
            self.dev_host_port = parse_port("GANTRY_DEV_PORT", v)?;
        }
        if let Some(v) = env.get("GANTRY_STARTUP_WAIT") {
            self.startup_wait_secs = parse_secs("GANTRY_STARTUP_WAIT", v)?;
        }
        if let Some(v) = env.get("GANTRY_PROBE_TIMEOUT") {
            self.probe_timeout_secs = parse_secs("GANTRY_PROBE_TIMEOUT", v)?;
        }
        if let Some(v) = env.get("GANTRY_PUSH") {
            self.push = matches!(v.as_str(), "1" | "true" | "yes");
        }
        if let Some(v) = env.get("GANTRY_COMPOSE_PROD") {
            self.compose_prod_file = PathBuf::from(v);
        }
        if let Some(v) = env.get("GANTRY_COMPOSE_DEV") {
            self.compose_dev_file = PathBuf::from(v);
        }
        if let Some(v) = env.get("GANTRY_DOCKER_PATH") {
            self.docker_path = v.clone();
        }
        if let Some(v) = env.get("GANTRY_NPM_PATH") {
            self.npm_path = v.clone();
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.image.trim().is_empty() {
            anyhow::bail!("image name must not be empty");
        }
        if self.image.contains(char::is_whitespace) {
            anyhow::bail!("image name must not contain whitespace: '{}'", self.image);
        }
        if self.prod_host_port == 0 || self.dev_host_port == 0 {
            anyhow::bail!("host ports must be non-zero");
        }
        if self.prod_host_port == self.dev_host_port {
            anyhow::bail!(
                "production and development host ports collide on {}",
                self.prod_host_port
            );
        }
        if self.startup_wait_secs == 0 {
            anyhow::bail!("startup wait must be at least 1 second");
        }
        if self.push && self.registry.is_none() {
            anyhow::bail!("push is enabled but no registry is configured");
        }
        Ok(())
    }
}

fn parse_port(name: &str, value: &str) -> Result<u16> {
    value
        .parse::<u16>()
        .with_context(|| format!("{} is not a valid port: '{}'", name, value))
}

fn parse_secs(name: &str, value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .with_context(|| format!("{} is not a valid duration in seconds: '{}'", name, value))
}
