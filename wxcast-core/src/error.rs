use std::fmt;

/// Coarse classification of a [`WxError`], for callers that branch on the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Unreachable,
    InvalidResponse,
    ConfigMissing,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Unreachable => "unreachable",
            ErrorKind::InvalidResponse => "invalid response",
            ErrorKind::ConfigMissing => "config missing",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every failure the data accessor can report. The message is meant for humans.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WxError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unreachable(String),

    #[error("{0}")]
    InvalidResponse(String),

    #[error("{0}")]
    ConfigMissing(String),
}

impl WxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WxError::NotFound(_) => ErrorKind::NotFound,
            WxError::Unreachable(_) => ErrorKind::Unreachable,
            WxError::InvalidResponse(_) => ErrorKind::InvalidResponse,
            WxError::ConfigMissing(_) => ErrorKind::ConfigMissing,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            WxError::NotFound(msg)
            | WxError::Unreachable(msg)
            | WxError::InvalidResponse(msg)
            | WxError::ConfigMissing(msg) => msg,
        }
    }
}

pub type Result<T, E = WxError> = std::result::Result<T, E>;
