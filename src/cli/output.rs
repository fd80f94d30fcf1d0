//! CLI output formatting

use crate::{
    core::{RunStatus, StageState},
    execution::ExecutionEvent,
    runtime::ImageRecord,
    tools::ToolReport,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static WHALE: Emoji<'_, '_> = Emoji("🐳 ", "# ");

/// Progress bar over a run's stages
pub fn create_stage_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a stage state for display
pub fn format_stage_state(state: &StageState) -> String {
    match state {
        StageState::Pending => style("PENDING").dim().to_string(),
        StageState::Running { .. } => style("RUNNING").yellow().to_string(),
        StageState::Completed { .. } => style("COMPLETED").green().to_string(),
        StageState::Failed { .. } => style("FAILED").red().to_string(),
        StageState::Skipped { .. } => style("SKIPPED").dim().to_string(),
    }
}

/// Format a run status for display
pub fn format_run_status(status: RunStatus) -> String {
    match status {
        RunStatus::Pending => style("PENDING").dim().to_string(),
        RunStatus::Running => style("RUNNING").yellow().to_string(),
        RunStatus::Completed => style("COMPLETED").green().to_string(),
        RunStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            run_id,
            pipeline_name,
        } => format!(
            "{} Starting {} ({})",
            ROCKET,
            style(pipeline_name).bold(),
            style(&run_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::StageStarted { name, .. } => {
            format!("{} {}", SPINNER, style(name).cyan())
        }
        ExecutionEvent::StageCompleted { stage_id, detail } => {
            format!(
                "{} {} {}",
                CHECK,
                style(stage_id).green(),
                style(detail).dim()
            )
        }
        ExecutionEvent::StageFailed { stage_id, error } => {
            format!("{} {}: {}", CROSS, style(stage_id).red(), style(error).dim())
        }
        ExecutionEvent::StageSkipped { stage_id, reason } => {
            format!(
                "{} {} skipped ({})",
                WARN,
                style(stage_id).yellow(),
                style(reason).dim()
            )
        }
        ExecutionEvent::BranchStarted { branch } => {
            format!("{} branch {}", INFO, style(branch).bold())
        }
        ExecutionEvent::PipelineCompleted { run_id, status } => {
            let status_str = match status {
                RunStatus::Completed => style("completed").green().to_string(),
                RunStatus::Failed => style("failed").red().to_string(),
                _ => format!("{:?}", status),
            };
            format!(
                "{} Run ({}) {}",
                INFO,
                style(&run_id.to_string()[..8]).dim(),
                status_str
            )
        }
    }
}

/// Format the sizes report as an aligned table
pub fn format_size_table(records: &[ImageRecord]) -> String {
    let reference_width = records
        .iter()
        .map(|r| r.reference.len())
        .max()
        .unwrap_or(0)
        .max("REPOSITORY:TAG".len());
    let size_width = records
        .iter()
        .map(|r| r.size.len())
        .max()
        .unwrap_or(0)
        .max("SIZE".len());

    // Plain text for the aligned columns; ANSI codes would throw the
    // widths off.
    let mut table = format!(
        "{:<w$}  {:<s$}  CREATED",
        "REPOSITORY:TAG",
        "SIZE",
        w = reference_width,
        s = size_width,
    );
    for record in records {
        table.push_str(&format!(
            "\n{:<w$}  {:<s$}  {}",
            record.reference,
            record.size,
            record.created,
            w = reference_width,
            s = size_width,
        ));
    }
    table
}

/// Format one doctor line
pub fn format_tool_report(report: &ToolReport) -> String {
    match &report.version {
        Some(version) => format!(
            "{} {} {}",
            CHECK,
            style(&report.name).bold(),
            style(version).dim()
        ),
        None if report.required => format!(
            "{} {} {}",
            CROSS,
            style(&report.name).bold(),
            style("not found (required)").red()
        ),
        None => format!(
            "{} {} {}",
            WARN,
            style(&report.name).bold(),
            style("not found").yellow()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_table_lists_every_record() {
        let records = vec![
            ImageRecord {
                reference: "webapp:prod-42".to_string(),
                size: "52.3MB".to_string(),
                created: "2 minutes ago".to_string(),
            },
            ImageRecord {
                reference: "webapp:dev-latest".to_string(),
                size: "489MB".to_string(),
                created: "2 minutes ago".to_string(),
            },
        ];

        let table = format_size_table(&records);
        assert!(table.contains("webapp:prod-42"));
        assert!(table.contains("webapp:dev-latest"));
        assert!(table.contains("489MB"));
    }

    #[test]
    fn test_tool_report_formats() {
        let installed = ToolReport {
            name: "docker".to_string(),
            version: Some("Docker version 27.0.3".to_string()),
            required: true,
        };
        assert!(format_tool_report(&installed).contains("Docker version"));

        let missing = ToolReport {
            name: "docker".to_string(),
            version: None,
            required: true,
        };
        assert!(format_tool_report(&missing).contains("required"));
    }
}
