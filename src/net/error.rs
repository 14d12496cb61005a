//! Failure taxonomy surfaced by the API client.
//!
//! ERROR HANDLING
//! ==============
//! Views never match on transport details. They call [`ApiError::user_message`]
//! and, for [`ApiError::Unauthorized`], do nothing at all: the client has
//! already cleared the session and announced it.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use serde_json::Value;

pub const CONNECTION_ERROR_MESSAGE: &str = "Erreur de connexion au serveur";
pub const GENERIC_ERROR_MESSAGE: &str = "Une erreur est survenue";
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expirée, veuillez vous reconnecter";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("transport failure: {0}")]
    Transport(String),

    /// No response within the client timeout.
    #[error("request timed out")]
    Timeout,

    /// The backend rejected the credential (HTTP 401).
    #[error("session rejected by server")]
    Unauthorized,

    /// Any other non-success response.
    #[error("server returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Application { status: u16, message: Option<String> },

    /// A success response whose body did not match the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),
}

impl ApiError {
    /// Text to show the user for this failure.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Transport(_) | Self::Timeout => CONNECTION_ERROR_MESSAGE,
            Self::Unauthorized => SESSION_EXPIRED_MESSAGE,
            Self::Application { message: Some(message), .. } => message,
            Self::Application { message: None, .. } | Self::Decode(_) => GENERIC_ERROR_MESSAGE,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Application { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// The backend uses `{"error": "..."}`; a few routes answer
/// `{"message": "..."}` instead.
pub(crate) fn error_body_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["error", "message"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(ToOwned::to_owned)
}
