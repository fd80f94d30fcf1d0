//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{DoctorCommand, SizesCommand};

/// Local container build/test/cleanup cycles for a web app
#[derive(Debug, Parser, Clone)]
#[command(name = "gantry")]
#[command(version = "0.1.0")]
#[command(about = "Build, smoke-test, and tear down the web app's container images", long_about = None)]
pub struct Cli {
    /// Invoked without a subcommand, gantry prints usage and exits zero
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Build and smoke-test the production image
    Prod,

    /// Build and smoke-test the development image
    Dev,

    /// Run the production and development cycles in parallel
    Both,

    /// Report image sizes for the configured repository
    Sizes(SizesCommand),

    /// Stop and remove test containers, compose stacks, dangling images
    Cleanup,

    /// Bring the development compose file up
    ComposeDev,

    /// Bring the production compose file up
    ComposeProd,

    /// Run the full CI pipeline locally
    Ci,

    /// Check that docker, compose, node, and npm are available
    Doctor(DoctorCommand),
}

impl Cli {
    /// Parse CLI arguments from the environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

use std::ffi::OsString;
