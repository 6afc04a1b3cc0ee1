use std::fmt;
use std::path::PathBuf;

use migrun_config::RunnerConfig;

pub const HEADING: &str = "MIGRATION INSTRUCTIONS";

/// The manual fallback shown after every run.
#[derive(Debug, Clone)]
pub struct ManualInstructions {
    pub editor_url: String,
    pub migration_path: PathBuf,
    pub cli_fallback: String,
}

impl ManualInstructions {
    pub fn from_config(config: &RunnerConfig) -> Self {
        // Show an absolute path when we can; the operator pastes it elsewhere.
        let migration_path = std::path::absolute(&config.migration_path)
            .unwrap_or_else(|_| config.migration_path.clone());
        Self {
            editor_url: config.sql_editor_url(),
            migration_path,
            cli_fallback: config.cli_fallback.clone(),
        }
    }
}

impl fmt::Display for ManualInstructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "{HEADING}:")?;
        writeln!(f, "{rule}")?;
        writeln!(f)?;
        writeln!(
            f,
            "If the statements above were not applied, run the migration manually:"
        )?;
        writeln!(f)?;
        writeln!(f, "1. Go to: {}", self.editor_url)?;
        writeln!(f, "2. Copy the entire content from:")?;
        writeln!(f, "   {}", self.migration_path.display())?;
        writeln!(f, "3. Paste it into the SQL Editor")?;
        writeln!(f, "4. Click 'Run'")?;
        writeln!(f)?;
        writeln!(f, "Or use the CLI:")?;
        writeln!(f, "   {}", self.cli_fallback)?;
        writeln!(f)?;
        writeln!(f, "{rule}")
    }
}
