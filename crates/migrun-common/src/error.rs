use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    /// The migration file could not be read. Raised before any remote call.
    #[error("failed to read migration file {}: {source}", path.display())]
    MigrationFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("remote error: {0}")]
    Remote(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
