use std::fmt;

use crate::escrow::EscrowValidationError;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ClientError {
    /// The request never produced an HTTP response (DNS, TLS, timeout, socket).
    Network(String),
    /// The backend answered with a non-success status.
    Http {
        status: u16,
        code: Option<String>,
        message: String,
    },
    InvalidToken(String),
    Unauthenticated(String),
    Storage(String),
    Validation(EscrowValidationError),
    Decode(String),
    InvalidConfig(String),
}

impl ClientError {
    pub fn http(status: u16, code: Option<String>, message: impl Into<String>) -> Self {
        ClientError::Http {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Machine-readable error code supplied by the backend, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Http { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// `true` when the backend rejected the credential itself.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ClientError::Http {
                status: 401 | 403,
                ..
            } | ClientError::Unauthenticated(_)
                | ClientError::InvalidToken(_)
        )
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Network(message) => write!(f, "Network error: {message}"),
            ClientError::Http {
                status,
                code: Some(code),
                message,
            } => write!(f, "HTTP {status} ({code}): {message}"),
            ClientError::Http {
                status,
                code: None,
                message,
            } => write!(f, "HTTP {status}: {message}"),
            ClientError::InvalidToken(message) => write!(f, "Invalid token: {message}"),
            ClientError::Unauthenticated(message) => write!(f, "Not authenticated: {message}"),
            ClientError::Storage(message) => write!(f, "Storage error: {message}"),
            ClientError::Validation(err) => write!(f, "{err}"),
            ClientError::Decode(message) => write!(f, "Failed to decode response: {message}"),
            ClientError::InvalidConfig(message) => write!(f, "Invalid configuration: {message}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EscrowValidationError> for ClientError {
    fn from(error: EscrowValidationError) -> Self {
        ClientError::Validation(error)
    }
}

impl From<url::ParseError> for ClientError {
    fn from(error: url::ParseError) -> Self {
        ClientError::InvalidConfig(error.to_string())
    }
}
