//! Compose invocation arguments
//!
//! The compose subcommands shell out through the same docker binary; only
//! the argument lists differ per direction.

use std::path::Path;

/// Arguments for `docker compose -f <file> up -d --build`
pub fn up_args(file: &Path) -> Vec<String> {
    vec![
        "compose".to_string(),
        "-f".to_string(),
        file.display().to_string(),
        "up".to_string(),
        "-d".to_string(),
        "--build".to_string(),
    ]
}

/// Arguments for `docker compose -f <file> down --remove-orphans`
pub fn down_args(file: &Path) -> Vec<String> {
    vec![
        "compose".to_string(),
        "-f".to_string(),
        file.display().to_string(),
        "down".to_string(),
        "--remove-orphans".to_string(),
    ]
}
