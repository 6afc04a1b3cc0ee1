use std::path::PathBuf;

use migrun_common::{Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_MIGRATION_PATH: &str =
    "migrations/20251114155316_add_is_default_to_trading_accounts.sql";

/// A server-side function that executes arbitrary SQL passed as one named
/// argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlGateway {
    pub function: String,
    pub param: String,
}

impl SqlGateway {
    pub fn new(function: &str, param: &str) -> Self {
        Self {
            function: function.to_string(),
            param: param.to_string(),
        }
    }
}

/// Everything the runner needs to reach the project and describe the
/// manual fallback. Connection details never live in source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub endpoint: String,
    pub service_key: String,
    pub migration_path: PathBuf,
    /// Optional SQL gateway functions, tried in order. The next one is only
    /// used when the previous one is not installed.
    pub gateways: Vec<SqlGateway>,
    pub table: String,
    pub column: String,
    pub dashboard_url: Option<String>,
    pub cli_fallback: String,
    pub timeout_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            service_key: String::new(),
            migration_path: PathBuf::from(DEFAULT_MIGRATION_PATH),
            gateways: vec![
                SqlGateway::new("exec_sql", "sql_query"),
                SqlGateway::new("query", "query"),
            ],
            table: "trading_accounts".to_string(),
            column: "is_default".to_string(),
            dashboard_url: None,
            cli_fallback: "supabase db push".to_string(),
            timeout_secs: 30,
        }
    }
}

impl RunnerConfig {
    /// Check the settings that must be present before talking to the remote.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::Config(
                "endpoint is empty (set SUPABASE_URL or --endpoint)".into(),
            ));
        }
        let url = Url::parse(&self.endpoint)
            .map_err(|e| Error::Config(format!("invalid endpoint {}: {e}", self.endpoint)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "endpoint must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.service_key.trim().is_empty() {
            return Err(Error::Config(
                "service key is empty (set SUPABASE_SERVICE_ROLE_KEY or --service-key)".into(),
            ));
        }
        if self.gateways.is_empty() {
            return Err(Error::Config("at least one SQL gateway is required".into()));
        }
        if self
            .gateways
            .iter()
            .any(|g| g.function.is_empty() || g.param.is_empty())
        {
            return Err(Error::Config(
                "gateway function and param must not be empty".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be at least 1".into()));
        }
        if self.table.is_empty() || self.column.is_empty() {
            return Err(Error::Config("table and column must not be empty".into()));
        }
        Ok(())
    }

    /// Project reference: the first label of the endpoint host, e.g. `abcd`
    /// for `https://abcd.supabase.co`.
    pub fn project_ref(&self) -> Option<String> {
        let url = Url::parse(&self.endpoint).ok()?;
        let host = url.host_str()?;
        let (first, rest) = host.split_once('.')?;
        if first.is_empty() || rest.is_empty() {
            return None;
        }
        Some(first.to_string())
    }

    /// SQL editor URL shown in the manual instructions.
    pub fn sql_editor_url(&self) -> String {
        if let Some(url) = &self.dashboard_url {
            return url.clone();
        }
        match self.project_ref() {
            Some(project) => format!("https://supabase.com/dashboard/project/{project}/sql/new"),
            None => "https://supabase.com/dashboard (open your project's SQL Editor)".to_string(),
        }
    }
}
