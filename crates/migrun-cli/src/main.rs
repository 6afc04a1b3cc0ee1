mod banner;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use migrun_config::{ConfigLoader, RunnerConfig};
use migrun_remote::PostgrestClient;
use migrun_runner::{MigrationPlan, MigrationRunner, PlanSource, load_statements};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn,migrun=info,migrun_runner=info,migrun_remote=info,migrun_config=info";

#[derive(Parser)]
#[command(name = "migrun", version, about = "Apply and verify a schema migration through a hosted database API")]
struct Cli {
    /// YAML or TOML config file
    #[arg(short, long, global = true, env = "MIGRUN_CONFIG")]
    config: Option<PathBuf>,

    /// Project URL, e.g. https://<ref>.supabase.co
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Service-role key
    #[arg(long, global = true)]
    service_key: Option<String>,

    /// Migration SQL file
    #[arg(short, long, global = true)]
    migration: Option<PathBuf>,

    /// Split the migration file into statements instead of using the built-in plan
    #[arg(long, global = true)]
    split: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Execute every statement, print manual instructions, then verify (default)
    Apply,
    /// Only check whether the migration's column exists
    Verify,
    /// Print the statements that would be executed
    Plan,
}

impl Cli {
    fn plan_source(&self) -> PlanSource {
        if self.split {
            PlanSource::SplitFile
        } else {
            PlanSource::Builtin
        }
    }

    /// Flags take precedence over file and environment values.
    fn apply_overrides(&self, config: &mut RunnerConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(key) = &self.service_key {
            config.service_key = key.clone();
        }
        if let Some(path) = &self.migration {
            config.migration_path = path.clone();
        }
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_runner(config: &RunnerConfig) -> Result<MigrationRunner> {
    config.validate()?;
    let client = PostgrestClient::new(
        &config.endpoint,
        &config.service_key,
        Duration::from_secs(config.timeout_secs),
    )?;
    debug!("using {}", client.rest_url());
    Ok(MigrationRunner::new(Arc::new(client), config.gateways.clone()))
}

/// Print each statement with its ordinal and name, without touching the remote.
fn print_plan(out: &mut dyn Write, plan: &MigrationPlan) -> std::io::Result<()> {
    writeln!(
        out,
        "{} ({} characters, {} statements)",
        plan.path.display(),
        plan.source_len,
        plan.statements.len()
    )?;
    for stmt in &plan.statements {
        writeln!(out)?;
        writeln!(out, "-- [{}] {}", stmt.ordinal, stmt.name)?;
        writeln!(out, "{}", stmt.sql)?;
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads the environment.
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    if let Ok(path) = dotenv {
        debug!("loaded environment from {}", path.display());
    }

    let mut config =
        ConfigLoader::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply_overrides(&mut config);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command.as_ref().unwrap_or(&Command::Apply) {
        Command::Apply => {
            let runner = build_runner(&config)?;
            info!("applying {}", config.migration_path.display());
            let summary =
                migrun_runner::run_pipeline(&runner, &config, cli.plan_source(), &mut out).await?;
            banner::print_summary(&mut out, &config, &summary)?;
        }
        Command::Verify => {
            let runner = build_runner(&config)?;
            migrun_runner::verify(&runner, &config, &mut out).await?;
        }
        Command::Plan => {
            let plan = load_statements(&config.migration_path, cli.plan_source())?;
            print_plan(&mut out, &plan)?;
        }
    }

    out.flush()?;
    Ok(())
}
