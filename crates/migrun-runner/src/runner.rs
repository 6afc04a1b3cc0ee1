use std::io::Write;
use std::sync::Arc;

use migrun_common::Result;
use migrun_config::SqlGateway;
use migrun_remote::{DatabaseApi, RemoteError, RemoteErrorKind};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::outcome::{ExecutionOutcome, RunReport, VerificationResult};
use crate::statements::Statement;

const PREVIEW_CHARS: usize = 80;

/// Sends migration statements through remote SQL gateway functions and
/// reads the target column afterwards.
pub struct MigrationRunner {
    api: Arc<dyn DatabaseApi>,
    gateways: Vec<SqlGateway>,
}

impl MigrationRunner {
    pub fn new(api: Arc<dyn DatabaseApi>, gateways: Vec<SqlGateway>) -> Self {
        Self { api, gateways }
    }

    /// Execute one statement and classify the result.
    ///
    /// Gateways are tried in order; a gateway that is not installed hands the
    /// statement to the next one. Any other answer is final.
    pub async fn execute_statement(&self, sql: &str) -> ExecutionOutcome {
        for gateway in &self.gateways {
            let mut args = Map::new();
            args.insert(gateway.param.clone(), Value::String(sql.to_string()));

            match self.api.rpc(&gateway.function, Value::Object(args)).await {
                Ok(_) => return ExecutionOutcome::Succeeded,
                Err(e) if e.kind() == RemoteErrorKind::FunctionMissing => {
                    debug!("gateway {} not installed, trying next", gateway.function);
                }
                Err(e) => return ExecutionOutcome::Failed(e.full_text()),
            }
        }
        ExecutionOutcome::UnsupportedOperation
    }

    /// Execute every statement in order, reporting progress to `out`.
    /// Never stops early: a failed or unsupported statement does not keep
    /// later ones from being attempted.
    pub async fn run_all(&self, statements: &[Statement], out: &mut dyn Write) -> Result<RunReport> {
        let total = statements.len();
        let mut report = RunReport::default();

        for stmt in statements {
            writeln!(out)?;
            writeln!(out, "[{}/{total}] Executing {}:", stmt.ordinal, stmt.name)?;
            writeln!(out, "  {}", stmt.preview(PREVIEW_CHARS))?;

            let outcome = self.execute_statement(&stmt.sql).await;
            match &outcome {
                ExecutionOutcome::Succeeded => {
                    info!("statement {}/{total} ({}) applied", stmt.ordinal, stmt.name);
                    writeln!(out, "  Success")?;
                }
                ExecutionOutcome::UnsupportedOperation => {
                    debug!(
                        "statement {}/{total}: no SQL gateway installed",
                        stmt.ordinal
                    );
                    writeln!(out, "  Direct SQL execution is not available via the REST API")?;
                    writeln!(out, "  Apply the migration manually (see instructions below)")?;
                }
                ExecutionOutcome::Failed(message) => {
                    warn!("statement {}/{total} failed: {message}", stmt.ordinal);
                    writeln!(out, "  Error: {message}")?;
                    if stmt.is_idempotent() {
                        writeln!(
                            out,
                            "  Note: this statement is guarded (IF [NOT] EXISTS / OR REPLACE) and may already be applied"
                        )?;
                    }
                }
            }
            report.outcomes.push(outcome);
        }

        info!(
            "{total} statements attempted: {} succeeded, {} unsupported, {} failed",
            report.succeeded(),
            report.unsupported(),
            report.failed()
        );
        Ok(report)
    }

    /// Read one row of `column` from `table` to see whether it exists.
    pub async fn verify_applied(&self, table: &str, column: &str) -> VerificationResult {
        match self.api.select(table, column, 1).await {
            Ok(rows) => {
                debug!("verification read returned {} row(s)", rows.len());
                VerificationResult::Confirmed
            }
            Err(e) => verification_for(&e),
        }
    }
}

fn verification_for(err: &RemoteError) -> VerificationResult {
    match err.kind() {
        RemoteErrorKind::ObjectMissing => VerificationResult::NotYetApplied,
        RemoteErrorKind::FunctionMissing | RemoteErrorKind::Other => {
            VerificationResult::Indeterminate(err.full_text())
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use migrun_config::RunnerConfig;

    use super::*;
    use crate::statements::{BUILTIN_PLAN, Statement};
    use crate::testing::{Call, FakeApi};

    fn builtin_statements() -> Vec<Statement> {
        BUILTIN_PLAN
            .iter()
            .enumerate()
            .map(|(i, s)| Statement {
                ordinal: i + 1,
                name: s.name.into(),
                sql: s.sql.into(),
            })
            .collect()
    }

    fn runner(api: &Arc<FakeApi>) -> MigrationRunner {
        MigrationRunner::new(api.clone(), RunnerConfig::default().gateways)
    }

    #[tokio::test]
    async fn execute_statement_sends_sql_as_named_argument() {
        let api = Arc::new(FakeApi::accepting());
        let outcome = runner(&api).execute_statement("SELECT 1;").await;

        assert_eq!(outcome, ExecutionOutcome::Succeeded);
        assert_eq!(
            api.calls(),
            vec![Call::Rpc {
                function: "exec_sql".into(),
                args: json!({ "sql_query": "SELECT 1;" }),
            }]
        );
    }

    #[tokio::test]
    async fn execute_statement_classifies_errors() {
        let api = Arc::new(FakeApi::rpc_failing(
            RemoteError::new("Could not find the function public.exec_sql(sql_query)")
                .with_code("PGRST202"),
        ));
        assert_eq!(
            runner(&api).execute_statement("SELECT 1;").await,
            ExecutionOutcome::UnsupportedOperation
        );

        let api = Arc::new(FakeApi::rpc_failing(RemoteError::new("permission denied")));
        assert_eq!(
            runner(&api).execute_statement("SELECT 1;").await,
            ExecutionOutcome::Failed("permission denied".into())
        );
        // a real failure is final; the next gateway is not tried
        assert_eq!(api.rpc_functions(), vec!["exec_sql"]);
    }

    #[tokio::test]
    async fn execute_statement_falls_back_to_next_gateway() {
        let api = Arc::new(FakeApi::accepting().without_function("exec_sql"));
        let outcome = runner(&api).execute_statement("SELECT 1;").await;

        assert_eq!(outcome, ExecutionOutcome::Succeeded);
        assert_eq!(
            api.calls(),
            vec![
                Call::Rpc {
                    function: "exec_sql".into(),
                    args: json!({ "sql_query": "SELECT 1;" }),
                },
                Call::Rpc {
                    function: "query".into(),
                    args: json!({ "query": "SELECT 1;" }),
                },
            ]
        );
    }

    #[tokio::test]
    async fn execute_statement_is_unsupported_only_when_every_gateway_is_missing() {
        let api = Arc::new(
            FakeApi::accepting()
                .without_function("exec_sql")
                .without_function("query"),
        );
        assert_eq!(
            runner(&api).execute_statement("SELECT 1;").await,
            ExecutionOutcome::UnsupportedOperation
        );
        assert_eq!(api.rpc_functions(), vec!["exec_sql", "query"]);

        let api = Arc::new(FakeApi::accepting().without_function("exec_sql"));
        let single = MigrationRunner::new(api.clone(), vec![SqlGateway::new("exec_sql", "sql_query")]);
        assert_eq!(
            single.execute_statement("SELECT 1;").await,
            ExecutionOutcome::UnsupportedOperation
        );
    }

    #[tokio::test]
    async fn run_all_executes_each_statement_once_in_order() {
        let api = Arc::new(FakeApi::rpc_failing(RemoteError::new("boom")));
        let statements = builtin_statements();
        let mut out = Vec::new();

        let report = runner(&api).run_all(&statements, &mut out).await.unwrap();

        assert_eq!(report.outcomes.len(), 5);
        assert_eq!(report.failed(), 5);
        let sent: Vec<String> = api.rpc_sql();
        let expected: Vec<String> = statements.iter().map(|s| s.sql.clone()).collect();
        assert_eq!(sent, expected);
    }

    #[tokio::test]
    async fn run_all_marks_every_statement_unsupported() {
        let api = Arc::new(FakeApi::rpc_failing(RemoteError::new(
            "Could not find the function public.exec_sql(sql_query) in the schema cache",
        )));
        let mut out = Vec::new();

        let report = runner(&api)
            .run_all(&builtin_statements(), &mut out)
            .await
            .unwrap();

        assert!(report.all_unsupported());
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("Direct SQL execution is not available").count(), 5);
        assert!(text.contains("[1/5] Executing add column:"));
        assert!(text.contains("[5/5] Executing create trigger:"));
    }

    #[tokio::test]
    async fn failed_guarded_statement_gets_a_note() {
        let api = Arc::new(FakeApi::rpc_failing(RemoteError::new("already exists")));
        let statements = builtin_statements();
        let mut out = Vec::new();

        runner(&api).run_all(&statements[..1], &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Error: already exists"));
        assert!(text.contains("may already be applied"));
    }

    #[tokio::test]
    async fn verify_applied_maps_responses() {
        let api = Arc::new(FakeApi::accepting());
        assert_eq!(
            runner(&api).verify_applied("trading_accounts", "is_default").await,
            VerificationResult::Confirmed
        );
        assert_eq!(
            api.calls(),
            vec![Call::Select {
                table: "trading_accounts".into(),
                columns: "is_default".into(),
                limit: 1,
            }]
        );

        let api = Arc::new(FakeApi::select_failing(RemoteError::new(
            "column trading_accounts.is_default does not exist",
        )));
        assert_eq!(
            runner(&api).verify_applied("trading_accounts", "is_default").await,
            VerificationResult::NotYetApplied
        );

        let api = Arc::new(FakeApi::select_failing(RemoteError::new("JWT expired")));
        assert_eq!(
            runner(&api).verify_applied("trading_accounts", "is_default").await,
            VerificationResult::Indeterminate("JWT expired".into())
        );
    }
}
