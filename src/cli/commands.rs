//! CLI command definitions

use clap::Args;

/// Report image sizes for the configured repository
#[derive(Debug, Args, Clone)]
pub struct SizesCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Check the host toolchain
#[derive(Debug, Args, Clone)]
pub struct DoctorCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
