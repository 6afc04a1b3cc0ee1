pub mod client;
pub mod error;

use async_trait::async_trait;
use serde_json::Value;

pub use client::PostgrestClient;
pub use error::{RemoteError, RemoteErrorKind};

/// The two remote calls the migration runner needs from a hosted database.
#[async_trait]
pub trait DatabaseApi: Send + Sync {
    /// Invoke a server-side function with named JSON arguments.
    async fn rpc(&self, function: &str, args: Value) -> Result<Value, RemoteError>;

    /// Read at most `limit` rows of `columns` from `table`.
    async fn select(
        &self,
        table: &str,
        columns: &str,
        limit: usize,
    ) -> Result<Vec<Value>, RemoteError>;
}
