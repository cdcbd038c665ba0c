use reqwest::StatusCode;
use thiserror::Error;

/// Message shown for any server-side lookup failure.
pub const LOOKUP_FAILED_MESSAGE: &str = "Failed to lookup address";

/// Reportable lookup failures. A 404 is not one of these: it is a negative result.
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    #[error("lookup endpoint returned {0}")]
    Status(StatusCode),
    #[error("{0}")]
    Transport(String),
    #[error("undecodable lookup response: {0}")]
    Decode(String),
}

impl LookupError {
    /// Text published through the observable `error` state.
    pub fn user_message(&self) -> String {
        match self {
            LookupError::Status(_) | LookupError::Decode(_) => LOOKUP_FAILED_MESSAGE.to_string(),
            LookupError::Transport(message) => message.clone(),
        }
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return LookupError::Decode(err.to_string());
        }
        if let Some(status) = err.status() {
            return LookupError::Status(status);
        }
        if err.is_timeout() {
            return LookupError::Transport("Address lookup timed out".to_string());
        }
        LookupError::Transport(err.to_string())
    }
}
