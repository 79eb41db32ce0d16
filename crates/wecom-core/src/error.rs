//! Error types for the core library.

use thiserror::Error;

/// Core library error type.
///
/// `Remote` carries the `errcode`/`errmsg` pair reported by the WeCom API.
/// Every other variant is produced locally.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A configuration-related error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A path resolution or validation error.
    #[error("path error: {0}")]
    Path(String),

    /// An I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Access token retrieval failed.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Invalid message or upload parameters, rejected before any request is made.
    #[error("invalid parameters: {0}")]
    Validation(String),

    /// A transport or HTTP status error.
    #[error("API error: {0}")]
    Api(String),

    /// An error reported by the WeCom API in the response envelope.
    #[error("WeCom error {errcode}: {errmsg}")]
    Remote {
        /// Non-zero error code from the response.
        errcode: i64,
        /// Human-readable message from the response.
        errmsg: String,
    },
}

impl CoreError {
    /// Whether this error was reported by the remote API.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// The remote error code, if this is a remote error.
    #[must_use]
    pub const fn errcode(&self) -> Option<i64> {
        match self {
            Self::Remote { errcode, .. } => Some(*errcode),
            _ => None,
        }
    }
}

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_exposes_errcode() {
        let err = CoreError::Remote {
            errcode: 60020,
            errmsg: "not allow to access from your ip".to_string(),
        };
        assert!(err.is_remote());
        assert_eq!(err.errcode(), Some(60020));
        assert_eq!(
            err.to_string(),
            "WeCom error 60020: not allow to access from your ip"
        );
    }

    #[test]
    fn local_errors_have_no_errcode() {
        let err = CoreError::Validation("file too small".to_string());
        assert!(!err.is_remote());
        assert_eq!(err.errcode(), None);
    }
}
