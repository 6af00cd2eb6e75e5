//! Error types for volans

use thiserror::Error;

/// volans error types
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Namespace resolution or context switch failed
    #[error("Namespace error: {message}")]
    Namespace {
        /// Error message
        message: String,
    },

    /// Container runtime call failed
    #[error("Container runtime error: {message}")]
    Runtime {
        /// Error message
        message: String,
    },

    /// Kernel-formatted text could not be parsed
    #[error("Parse error: {message}")]
    Parse {
        /// Error message
        message: String,
    },

    /// Permission denied
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// Operation that was denied
        operation: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// Operation did not finish in time
    #[error("Timed out: {operation}")]
    Timeout {
        /// Operation that timed out
        operation: String,
    },

    /// System error from nix
    #[error("System error: {0}")]
    System(#[from] nix::Error),

    /// procfs read or parse failed
    #[error("procfs error: {0}")]
    Proc(#[from] procfs::ProcError),

    /// Worker ended without delivering its result
    #[error("Channel closed")]
    ChannelClosed,

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tokio::sync::oneshot::error::RecvError> for Error {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Self::ChannelClosed
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(_: tokio::task::JoinError) -> Self {
        Self::ChannelClosed
    }
}

impl Error {
    /// Build a parse error from anything printable
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Whether the error means the target vanished (process exited)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            Self::System(errno) => {
                matches!(errno, nix::errno::Errno::ENOENT | nix::errno::Errno::ESRCH)
            }
            Self::Proc(procfs::ProcError::NotFound(_)) => true,
            Self::Proc(procfs::ProcError::Io(e, _)) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Result type alias for volans operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let err = Error::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(err.is_not_found());

        let err = Error::from(nix::errno::Errno::ESRCH);
        assert!(err.is_not_found());

        let err = Error::from(procfs::ProcError::NotFound(None));
        assert!(err.is_not_found());

        let err = Error::parse("garbage");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_display() {
        let err = Error::Timeout {
            operation: "enter netns".to_string(),
        };
        assert_eq!(err.to_string(), "Timed out: enter netns");
    }
}
