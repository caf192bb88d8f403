//! Transport-level failures.

use pwgate_core::VaultError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("unauthorized ({status}): {body}")]
    Unauthorized { status: u16, body: String },

    #[error("request failed ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("response parse error: {0}")]
    Parse(String),

    #[error("session has been released")]
    Released,

    #[error("client setup failed: {0}")]
    Setup(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl ApiError {
    /// A failure while the session is being opened.
    pub fn into_handshake_error(self) -> VaultError {
        VaultError::Connection(self.to_string())
    }
}

impl From<ApiError> for VaultError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Timeout => Self::timeout(),
            ApiError::Unauthorized { body, .. } => {
                Self::Session(format!("session expired or unauthorized: {body}"))
            }
            ApiError::Released => Self::Session("session has been released".to_string()),
            ApiError::Status { status, body } => Self::Remote {
                status: Some(status),
                body,
            },
            ApiError::Setup(msg) => Self::Connection(msg),
            other @ (ApiError::Connect(_) | ApiError::Http(_) | ApiError::Parse(_)) => {
                Self::Remote {
                    status: None,
                    body: other.to_string(),
                }
            }
        }
    }
}
