//! Automation Hub CLI
//!
//! `plan` prints the execution plan for one requirement; `run` submits a batch
//! of requirements, waits for them and prints scheduler statistics.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use automation_hub::{
    local_scheduler, ConfigService, Context, EngineConfig, Environment, Planner, Requirement,
    SubmitOptions,
};

#[derive(Parser)]
#[command(name = "automation-hub", version, about = "Plan, schedule and execute automation tasks")]
struct Cli {
    /// Config file (default: ~/.automation-hub/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project root the requirements run against
    #[arg(long, global = true, default_value = ".")]
    project: PathBuf,

    /// Target environment
    #[arg(long, global = true, value_enum, default_value_t = EnvArg::Development)]
    environment: EnvArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the execution plan for a requirement as JSON
    Plan {
        /// JSON file holding one requirement
        requirement: PathBuf,
    },
    /// Submit requirements, wait for them to finish and print scheduler stats
    Run {
        /// JSON file holding one requirement or an array of them
        requirements: PathBuf,
        /// Give up waiting after this many seconds
        #[arg(long, default_value_t = 300)]
        wait_secs: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EnvArg {
    Development,
    Staging,
    Production,
}

impl From<EnvArg> for Environment {
    fn from(arg: EnvArg) -> Self {
        match arg {
            EnvArg::Development => Environment::Development,
            EnvArg::Staging => Environment::Staging,
            EnvArg::Production => Environment::Production,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RequirementFile {
    Many(Vec<Requirement>),
    One(Box<Requirement>),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.clone()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.log_level);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    let service = match path {
        Some(path) => ConfigService::load_from(path),
        None => ConfigService::new(),
    }
    .context("failed to load configuration")?;
    Ok(service.get_config().clone())
}

/// RUST_LOG wins over the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("automation_hub={level}")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

async fn run(cli: Cli, config: EngineConfig) -> Result<()> {
    let context = Context::new(&cli.project).with_environment(cli.environment.into());

    match cli.command {
        Commands::Plan { requirement } => {
            let requirement: Requirement = read_json(&requirement)?;
            let plan = Planner::new().create_execution_plan(&requirement, &context)?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Commands::Run {
            requirements,
            wait_secs,
        } => {
            let requirements = match read_json::<RequirementFile>(&requirements)? {
                RequirementFile::Many(list) => list,
                RequirementFile::One(one) => vec![*one],
            };

            let scheduler = local_scheduler(config).await?;
            for requirement in requirements {
                let requirement_id = requirement.id.clone();
                let task_id = scheduler
                    .submit_task(requirement, context.clone(), None, SubmitOptions::default())
                    .await
                    .with_context(|| format!("failed to submit requirement {requirement_id}"))?;
                info!(task_id = %task_id, requirement_id = %requirement_id, "Submitted");
            }

            let finished = tokio::time::timeout(Duration::from_secs(wait_secs), async {
                while !scheduler.is_idle().await {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            })
            .await;
            if finished.is_err() {
                warn!(wait_secs, "Timed out waiting for tasks; shutting down");
            }
            scheduler.shutdown().await;

            let stats = scheduler.get_scheduler_stats().await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}
