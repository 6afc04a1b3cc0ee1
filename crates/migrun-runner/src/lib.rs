pub mod instructions;
pub mod outcome;
pub mod pipeline;
pub mod runner;
pub mod statements;

#[cfg(test)]
mod testing;

pub use instructions::ManualInstructions;
pub use outcome::{ExecutionOutcome, RunReport, VerificationResult};
pub use pipeline::{PipelineSummary, run_pipeline, verify};
pub use runner::MigrationRunner;
pub use statements::{BUILTIN_PLAN, MigrationPlan, PlanSource, Statement, load_statements, split_sql};
