use anyhow::{Context, Result};
use clap::CommandFactory;
use gantry::cli::commands::{DoctorCommand, SizesCommand};
use gantry::cli::output::*;
use gantry::cli::{Cli, Command};
use gantry::core::{BuildVariant, GantryConfig, Pipeline};
use gantry::execution::{ExecutionEngine, ExecutionEvent};
use gantry::ops;
use gantry::runtime::DockerCli;
use gantry::tools;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // A bare invocation prints usage and exits zero
    let command = match cli.command {
        Some(command) => command,
        None => {
            Cli::command().print_long_help()?;
            return Ok(());
        }
    };

    let config = GantryConfig::load()?;
    let runtime = DockerCli::with_path(config.docker_path.clone());

    match command {
        Command::Prod => {
            run_pipeline(Pipeline::verify(BuildVariant::Production), runtime, config).await?
        }
        Command::Dev => {
            run_pipeline(Pipeline::verify(BuildVariant::Development), runtime, config).await?
        }
        Command::Both => run_pipeline(Pipeline::verify_both(), runtime, config).await?,
        Command::Ci => {
            let pipeline = Pipeline::ci(&config);
            run_pipeline(pipeline, runtime, config).await?
        }
        Command::Sizes(cmd) => report_sizes(&cmd, &runtime, &config).await?,
        Command::Cleanup => cleanup(&runtime, &config).await?,
        Command::ComposeDev => compose_up(BuildVariant::Development, &runtime, &config).await?,
        Command::ComposeProd => compose_up(BuildVariant::Production, &runtime, &config).await?,
        Command::Doctor(cmd) => doctor(&cmd, &config).await?,
    }

    Ok(())
}

async fn run_pipeline(
    mut pipeline: Pipeline,
    runtime: DockerCli,
    config: GantryConfig,
) -> Result<()> {
    println!(
        "{} Pipeline {} (image {}, build {})",
        WHALE,
        style(&pipeline.name).bold(),
        style(&config.image).cyan(),
        style(&config.build_number).cyan()
    );

    let bar = create_stage_bar(pipeline.total_stages());
    let progress = bar.clone();

    let engine = ExecutionEngine::new(runtime, config).with_event_handler(move |event| {
        if matches!(
            event,
            ExecutionEvent::StageCompleted { .. }
                | ExecutionEvent::StageFailed { .. }
                | ExecutionEvent::StageSkipped { .. }
        ) {
            progress.inc(1);
        }
        progress.println(format_execution_event(&event));
    });

    println!();
    let result = engine.execute(&mut pipeline).await;
    bar.finish_and_clear();

    // Stage summary
    println!();
    for stage in pipeline.stages() {
        println!(
            "  {} {}",
            format_stage_state(&stage.state),
            style(&stage.name).dim()
        );
    }

    if result.is_ok() {
        println!(
            "\n{} {} completed {}",
            CHECK,
            style(&pipeline.name).bold(),
            style("successfully").green()
        );
    } else {
        println!(
            "\n{} {} {}",
            CROSS,
            style(&pipeline.name).bold(),
            style("failed").red()
        );
        error!("{}", result.unwrap_err());
        std::process::exit(1);
    }

    Ok(())
}

async fn report_sizes(cmd: &SizesCommand, runtime: &DockerCli, config: &GantryConfig) -> Result<()> {
    let records = ops::sizes(runtime, config).await?;

    if records.is_empty() {
        println!(
            "{} No images tagged for {}",
            INFO,
            style(&config.image).bold()
        );
        return Ok(());
    }

    if cmd.json {
        let data = serde_json::json!({ "repository": config.image, "images": records });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        println!("{} Images for {}:", WHALE, style(&config.image).bold());
        println!("{}", format_size_table(&records));
    }

    Ok(())
}

async fn cleanup(runtime: &DockerCli, config: &GantryConfig) -> Result<()> {
    println!("{} Cleaning up test containers and images", WHALE);

    let summary = ops::cleanup(runtime, config).await;

    for name in &summary.stopped {
        println!("{} stopped {}", CHECK, style(name).bold());
    }
    for name in &summary.removed {
        println!("{} removed {}", CHECK, style(name).bold());
    }
    for file in &summary.compose_downed {
        println!("{} compose down ({})", CHECK, style(file.display()).bold());
    }
    println!(
        "{} removed {} dangling image(s)",
        CHECK, summary.dangling_removed
    );

    for name in &summary.still_running {
        println!("{} {} is still running", WARN, style(name).red());
    }

    Ok(())
}

async fn compose_up(
    variant: BuildVariant,
    runtime: &DockerCli,
    config: &GantryConfig,
) -> Result<()> {
    let file = variant.compose_file(config);
    println!(
        "{} Bringing up {} stack ({})",
        ROCKET,
        style(variant).bold(),
        style(file.display()).dim()
    );

    ops::compose_up(runtime, variant, config).await?;

    println!(
        "{} {} stack is up on port {}",
        CHECK,
        style(variant).bold(),
        style(variant.host_port(config)).cyan()
    );

    Ok(())
}

async fn doctor(cmd: &DoctorCommand, config: &GantryConfig) -> Result<()> {
    let reports = tools::doctor(&config.docker_path, &config.npm_path).await;

    if cmd.json {
        let data = serde_json::json!({ "tools": reports });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        println!("{} Host toolchain:", WHALE);
        for report in &reports {
            println!("  {}", format_tool_report(report));
        }
    }

    if reports.iter().any(|r| r.required && !r.installed()) {
        error!("required tools are missing");
        std::process::exit(1);
    }

    Ok(())
}
