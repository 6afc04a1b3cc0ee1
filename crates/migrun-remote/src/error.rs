use serde::Deserialize;
use thiserror::Error;

/// Coarse category of a remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The called server-side function is not installed.
    FunctionMissing,
    /// The table, column or relation the request targets does not exist.
    ObjectMissing,
    Other,
}

/// PostgREST error codes meaning "no such function in the schema cache".
const FUNCTION_MISSING_CODES: &[&str] = &["PGRST202"];

/// Postgres / PostgREST codes for an undefined column or relation.
const OBJECT_MISSING_CODES: &[&str] = &["42703", "42P01", "PGRST204", "PGRST205"];

/// A failed remote call, decoded from the PostgREST error body when there is one.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RemoteError {
    /// HTTP status; `None` when the request never got a response.
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
    pub details: Option<String>,
    pub hint: Option<String>,
    /// Server-side function the request targeted, for RPC calls.
    pub function: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
            details: None,
            hint: None,
            function: None,
        }
    }

    /// Transport failure: no HTTP response was received.
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::new(format!("request failed: {err}"))
    }

    /// Build from an HTTP status and raw response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let mut err = match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => Self {
                code: parsed.code,
                message: parsed
                    .message
                    .unwrap_or_else(|| format!("HTTP {status}")),
                details: parsed.details,
                hint: parsed.hint,
                ..Self::new("")
            },
            Err(_) if body.trim().is_empty() => Self::new(format!("HTTP {status}")),
            Err(_) => Self::new(body.trim().to_string()),
        };
        err.status = Some(status);
        err
    }

    pub fn with_function(mut self, function: &str) -> Self {
        self.function = Some(function.to_string());
        self
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }

    /// Classify this error. Structured codes are trusted first; message text
    /// is only consulted when the code is absent or unrecognised.
    pub fn kind(&self) -> RemoteErrorKind {
        if let Some(code) = self.code.as_deref() {
            if FUNCTION_MISSING_CODES.contains(&code) {
                return RemoteErrorKind::FunctionMissing;
            }
            if OBJECT_MISSING_CODES.contains(&code) {
                return RemoteErrorKind::ObjectMissing;
            }
        }

        let text = self.full_text().to_lowercase();
        if text.contains("could not find the function") {
            return RemoteErrorKind::FunctionMissing;
        }
        if let Some(function) = &self.function {
            let function = function.to_lowercase();
            if text.contains(&format!("function public.{function}"))
                || text.contains(&format!("function {function}("))
            {
                return RemoteErrorKind::FunctionMissing;
            }
        }
        if text.contains("does not exist") || text.contains("could not find the table") {
            return RemoteErrorKind::ObjectMissing;
        }
        RemoteErrorKind::Other
    }

    /// Message plus details and hint, as one line.
    pub fn full_text(&self) -> String {
        let mut text = self.message.clone();
        for extra in [&self.details, &self.hint].into_iter().flatten() {
            text.push_str(" (");
            text.push_str(extra);
            text.push(')');
        }
        text
    }
}
