//! Crate-level error type.
//!
//! Every fallible library call returns [`RoundtableError`]. The variants split
//! along the lines the coordinator cares about: local rejections that never
//! reach the network, transport failures, and server replies with a non-2xx
//! status (which may be a "round already running" conflict).

use thiserror::Error;

use crate::api::ErrorBody;

/// Fallback text shown to the user when the server gave no error message.
pub const DEFAULT_SUBMIT_FAILURE: &str = "질문 전송에 실패했습니다.";

/// Machine-readable conflict code the server may put in `ErrorBody::code`.
pub const CONFLICT_CODE: &str = "ALREADY_PROCESSING";

#[derive(Debug, Error)]
pub enum RoundtableError {
    /// The question was empty after trimming.
    #[error("question is empty")]
    EmptyQuestion,

    /// The role selection would have been empty.
    #[error("at least one role must be selected")]
    NoRolesSelected,

    /// A round is already in flight somewhere in this process.
    #[error("a conversation round is already in progress")]
    Busy,

    /// The server replied with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Api {
        status: u16,
        url: String,
        body: Option<ErrorBody>,
    },

    /// The request never produced a response.
    #[error("connection failed to {url}: {detail}")]
    Connect { url: String, detail: String },

    /// The request was sent but no response arrived in time. The server may
    /// still be acting on it.
    #[error("no response from {url} within the timeout")]
    Timeout { url: String },

    /// A response body could not be decoded.
    #[error("JSON parse error on {context}: {detail}")]
    Json { context: String, detail: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RoundtableError {
    /// HTTP status of an [`Api`](Self::Api) error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            RoundtableError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RoundtableError::Timeout { .. })
    }

    /// Whether this failure means another round is already running.
    ///
    /// A 409 status or the [`CONFLICT_CODE`] in the error body is
    /// authoritative. Matching `phrases` against the human-readable error text
    /// is a legacy fallback for servers that only report the condition in prose.
    pub fn is_conflict(&self, phrases: &[String]) -> bool {
        let RoundtableError::Api { status, body, .. } = self else {
            return false;
        };
        if *status == 409 {
            return true;
        }
        let Some(body) = body else {
            return false;
        };
        if body.code.as_deref() == Some(CONFLICT_CODE) {
            return true;
        }
        body.texts()
            .any(|text| phrases.iter().any(|p| !p.is_empty() && text.contains(p.as_str())))
    }

    /// Text suitable for an alert-level message to the user.
    pub fn user_message(&self) -> String {
        match self {
            RoundtableError::Api { body: Some(body), .. } => body
                .error
                .clone()
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SUBMIT_FAILURE.to_string()),
            RoundtableError::Api { .. }
            | RoundtableError::Connect { .. }
            | RoundtableError::Timeout { .. }
            | RoundtableError::Json { .. } => DEFAULT_SUBMIT_FAILURE.to_string(),
            other => other.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
