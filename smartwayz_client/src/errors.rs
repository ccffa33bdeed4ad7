use std::fmt;

use smartwayz_core::CoordinateError;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    #[error("invalid url")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http transport failed")]
    Http(#[from] reqwest::Error),
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("keyring operation failed")]
    Keyring(#[from] keyring::Error),
    #[error("token file operation failed")]
    Io(#[from] std::io::Error),
    #[error("json serialization failed")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid coordinates")]
    Coordinates(#[from] CoordinateError),
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },
    #[error("session expired: {reason}")]
    SessionExpired { reason: String },
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("request failed with status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("validation failed: {}", .messages.join("; "))]
    Validation { messages: Vec<String> },
    #[error("{0}")]
    Message(String),
}

impl ClientError {
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// HTTP status of the response that produced this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    pub fn display_chain(&self) -> DisplayChainedError<'_> {
        DisplayChainedError { inner: self }
    }
}

pub struct DisplayChainedError<'a> {
    inner: &'a (dyn std::error::Error + 'static),
}

impl fmt::Debug for DisplayChainedError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(self.inner);

        while let Some(err) = current {
            if first {
                first = false;
            } else {
                write!(f, " -> ")?;
            }

            write!(f, "{err}")?;
            current = err.source();
        }

        Ok(())
    }
}

impl fmt::Display for DisplayChainedError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
