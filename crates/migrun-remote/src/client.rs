use std::time::Duration;

use async_trait::async_trait;
use migrun_common::{Error, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;

use crate::DatabaseApi;
use crate::error::RemoteError;

/// HTTP client for a PostgREST endpoint (`<endpoint>/rest/v1`), authenticated
/// with a service key. One connection pool is shared by every call.
pub struct PostgrestClient {
    http: Client,
    rest_url: String,
    service_key: String,
}

impl PostgrestClient {
    pub fn new(endpoint: &str, service_key: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Remote(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            rest_url: format!("{}/rest/v1", endpoint.trim_end_matches('/')),
            service_key: service_key.to_string(),
        })
    }

    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn read_json(response: Response) -> std::result::Result<Value, RemoteError> {
        let status = response.status();
        let body = response.text().await.map_err(RemoteError::transport)?;

        if !status.is_success() {
            return Err(RemoteError::from_response(status.as_u16(), &body));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| RemoteError::new(format!("invalid JSON response: {e}")))
    }
}

#[async_trait]
impl DatabaseApi for PostgrestClient {
    async fn rpc(&self, function: &str, args: Value) -> std::result::Result<Value, RemoteError> {
        let url = format!("{}/rpc/{function}", self.rest_url);
        debug!("rpc POST {url}");

        let response = self
            .authorize(self.http.post(&url))
            .json(&args)
            .send()
            .await
            .map_err(|e| RemoteError::transport(e).with_function(function))?;

        Self::read_json(response)
            .await
            .map_err(|e| e.with_function(function))
    }

    async fn select(
        &self,
        table: &str,
        columns: &str,
        limit: usize,
    ) -> std::result::Result<Vec<Value>, RemoteError> {
        let url = format!("{}/{table}", self.rest_url);
        debug!("select GET {url} columns={columns} limit={limit}");
        let limit = limit.to_string();

        let response = self
            .authorize(self.http.get(&url))
            .query(&[("select", columns), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(RemoteError::transport)?;

        match Self::read_json(response).await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Err(RemoteError::new(format!(
                "expected a JSON array of rows, got {other}"
            ))),
        }
    }
}
