//! In-memory `DatabaseApi` that records every call.

use std::sync::Mutex;

use async_trait::async_trait;
use migrun_remote::{DatabaseApi, RemoteError};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Rpc { function: String, args: Value },
    Select { table: String, columns: String, limit: usize },
}

pub struct FakeApi {
    rpc_error: Option<RemoteError>,
    select_error: Option<RemoteError>,
    missing_functions: Vec<String>,
    /// `Some` when the fake tracks whether the migrated column exists.
    column_added: Option<Mutex<bool>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    /// Every call succeeds.
    pub fn accepting() -> Self {
        Self {
            rpc_error: None,
            select_error: None,
            missing_functions: Vec::new(),
            column_added: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn rpc_failing(err: RemoteError) -> Self {
        Self {
            rpc_error: Some(err),
            ..Self::accepting()
        }
    }

    pub fn select_failing(err: RemoteError) -> Self {
        Self {
            select_error: Some(err),
            ..Self::accepting()
        }
    }

    /// A database without the column yet. Reads of it fail until an
    /// `ADD COLUMN` statement runs, and an unguarded `ADD COLUMN` fails once
    /// the column is there.
    pub fn unmigrated() -> Self {
        Self {
            column_added: Some(Mutex::new(false)),
            ..Self::accepting()
        }
    }

    pub fn with_select_error(mut self, err: RemoteError) -> Self {
        self.select_error = Some(err);
        self
    }

    /// Answer calls to `function` as if it were not installed.
    pub fn without_function(mut self, function: &str) -> Self {
        self.missing_functions.push(function.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Functions named by every RPC call, in order.
    pub fn rpc_functions(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Rpc { function, .. } => Some(function),
                Call::Select { .. } => None,
            })
            .collect()
    }

    /// SQL text of every RPC call, in order.
    pub fn rpc_sql(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Rpc { args, .. } => sql_arg(&args),
                Call::Select { .. } => None,
            })
            .collect()
    }
}

fn sql_arg(args: &Value) -> Option<String> {
    args.as_object()?
        .values()
        .find_map(|v| v.as_str().map(str::to_string))
}

#[async_trait]
impl DatabaseApi for FakeApi {
    async fn rpc(&self, function: &str, args: Value) -> Result<Value, RemoteError> {
        let sql = sql_arg(&args).unwrap_or_default();
        self.calls.lock().unwrap().push(Call::Rpc {
            function: function.to_string(),
            args,
        });

        if self.missing_functions.iter().any(|f| f == function) {
            return Err(RemoteError::new(format!(
                "Could not find the function public.{function} in the schema cache"
            ))
            .with_code("PGRST202")
            .with_function(function));
        }
        if let Some(err) = &self.rpc_error {
            return Err(err.clone().with_function(function));
        }
        if let Some(added) = &self.column_added {
            let upper = sql.to_uppercase();
            if upper.contains("ADD COLUMN") {
                let mut added = added.lock().unwrap();
                if *added && !upper.contains("IF NOT EXISTS") {
                    return Err(RemoteError::new(
                        "column \"is_default\" of relation \"trading_accounts\" already exists",
                    )
                    .with_code("42701"));
                }
                *added = true;
            }
        }
        Ok(Value::Null)
    }

    async fn select(
        &self,
        table: &str,
        columns: &str,
        limit: usize,
    ) -> Result<Vec<Value>, RemoteError> {
        self.calls.lock().unwrap().push(Call::Select {
            table: table.to_string(),
            columns: columns.to_string(),
            limit,
        });
        if let Some(err) = &self.select_error {
            return Err(err.clone());
        }
        let column_missing = self
            .column_added
            .as_ref()
            .is_some_and(|added| !*added.lock().unwrap());
        if column_missing {
            return Err(RemoteError::new(format!(
                "column {table}.{columns} does not exist"
            ))
            .with_code("42703"));
        }

        let mut row = Map::new();
        row.insert(columns.to_string(), Value::Bool(false));
        Ok(vec![Value::Object(row)])
    }
}
