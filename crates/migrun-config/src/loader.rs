use std::path::{Path, PathBuf};

use migrun_common::{Error, Result};
use tracing::{debug, info};

use crate::model::RunnerConfig;

pub const ENV_ENDPOINT: &str = "SUPABASE_URL";
pub const ENV_SERVICE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";
pub const ENV_MIGRATION_PATH: &str = "MIGRUN_MIGRATION_PATH";

/// Builds a `RunnerConfig` from defaults, an optional file and the environment.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then `path` (if given), then process environment.
    pub fn load(path: Option<&Path>) -> Result<RunnerConfig> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => RunnerConfig::default(),
        };
        Self::apply_env(&mut config, |key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a YAML or TOML config file, chosen by extension.
    pub fn from_file(path: &Path) -> Result<RunnerConfig> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config = match ext {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("YAML parse error: {e}")))?,
            "toml" => toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("TOML parse error: {e}")))?,
            other => {
                return Err(Error::Config(format!(
                    "unsupported config extension: {other}"
                )));
            }
        };

        info!("config loaded from {}", path.display());
        Ok(config)
    }

    /// Overlay environment values. Empty values are ignored.
    pub fn apply_env<F>(config: &mut RunnerConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = get(ENV_ENDPOINT) {
            debug!("endpoint taken from {ENV_ENDPOINT}");
            config.endpoint = endpoint;
        }
        if let Some(key) = get(ENV_SERVICE_KEY) {
            debug!("service key taken from {ENV_SERVICE_KEY}");
            config.service_key = key;
        }
        if let Some(path) = get(ENV_MIGRATION_PATH) {
            config.migration_path = PathBuf::from(path);
        }
    }
}
