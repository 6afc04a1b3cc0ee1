use std::io::Write;

use migrun_common::Result;
use migrun_config::RunnerConfig;
use tracing::info;

use crate::instructions::ManualInstructions;
use crate::outcome::{RunReport, VerificationResult};
use crate::runner::MigrationRunner;
use crate::statements::{PlanSource, load_statements};

/// What a full pass produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub report: RunReport,
    pub verification: VerificationResult,
}

/// Load, execute every statement, print the manual instructions, then verify.
///
/// Only an unreadable migration file is an error, and it is raised before
/// any remote call. Remote failures end up in the summary.
pub async fn run_pipeline(
    runner: &MigrationRunner,
    config: &RunnerConfig,
    source: PlanSource,
    out: &mut dyn Write,
) -> Result<PipelineSummary> {
    writeln!(out, "Reading migration file...")?;
    let plan = load_statements(&config.migration_path, source)?;
    writeln!(out, "Migration SQL length: {} characters", plan.source_len)?;
    writeln!(out, "Executing {} SQL statements", plan.statements.len())?;

    let report = runner.run_all(&plan.statements, out).await?;

    // Printed on every run, whatever the per-statement outcomes were.
    writeln!(out)?;
    write!(out, "{}", ManualInstructions::from_config(config))?;

    let verification = verify(runner, config, out).await?;
    info!("pipeline finished: verification {verification}");

    Ok(PipelineSummary {
        report,
        verification,
    })
}

/// Probe the configured column and print what was found.
pub async fn verify(
    runner: &MigrationRunner,
    config: &RunnerConfig,
    out: &mut dyn Write,
) -> Result<VerificationResult> {
    writeln!(out)?;
    writeln!(out, "Checking if migration already applied...")?;

    let result = runner.verify_applied(&config.table, &config.column).await;
    let column = &config.column;
    match &result {
        VerificationResult::Confirmed => {
            writeln!(out, "SUCCESS! The '{column}' column already exists.")?;
            writeln!(out, "   Migration has been applied.")?;
        }
        VerificationResult::NotYetApplied => {
            writeln!(out, "The '{column}' column does not exist yet.")?;
            writeln!(out, "   Apply the migration using the instructions above.")?;
        }
        VerificationResult::Indeterminate(message) => {
            writeln!(out, "Could not verify: {message}")?;
        }
    }
    Ok(result)
}
