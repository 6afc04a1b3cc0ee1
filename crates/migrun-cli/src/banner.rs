use std::io::{self, Write};

use migrun_config::RunnerConfig;
use migrun_runner::{PipelineSummary, VerificationResult};

/// Print a boxed summary of the run: target, statement counts and verification.
pub fn print_summary(
    out: &mut dyn Write,
    config: &RunnerConfig,
    summary: &PipelineSummary,
) -> io::Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let report = &summary.report;

    let project = config
        .project_ref()
        .unwrap_or_else(|| config.endpoint.clone());
    let target = format!("{}.{}", config.table, config.column);
    let statements = format!(
        "{} total, {} ok, {} unsupported, {} failed",
        report.outcomes.len(),
        report.succeeded(),
        report.unsupported(),
        report.failed()
    );
    let verification = match &summary.verification {
        VerificationResult::Confirmed => "confirmed".to_string(),
        VerificationResult::NotYetApplied => "not yet applied".to_string(),
        VerificationResult::Indeterminate(_) => "indeterminate".to_string(),
    };

    let width = 70;
    let label_w = 14;
    let value_w = width - label_w - 4; // "│ " + "│"

    let title = format!("migrun v{version}");
    let title_dashes = width - 2 - title.chars().count() - 5; // ╭╮ plus "─── " and " "
    let top = format!("╭─── {title} {}╮", "─".repeat(title_dashes));
    let bottom = format!("╰{}╯", "─".repeat(width - 2));

    let row = |l: &str, r: &str| {
        let r: String = r.chars().take(value_w).collect();
        format!("│ {:<label_w$}{:<value_w$} │", l, r)
    };

    writeln!(out)?;
    writeln!(out, "{top}")?;
    writeln!(out, "{}", row("Project", &project))?;
    writeln!(out, "{}", row("Target", &target))?;
    writeln!(out, "{}", row("Statements", &statements))?;
    writeln!(out, "{}", row("Verification", &verification))?;
    writeln!(out, "{bottom}")
}
