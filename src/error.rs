//! Error types for questlog
//!
//! Exit codes:
//! - 2: User error (bad args, bad config, unknown task, missing identity)
//! - 4: Operation failed (I/O, serialization, lock contention)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the ql CLI
pub mod exit_codes {
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for questlog operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("No user identity: pass --user, set QUESTLOG_USER, or run `ql user set <name>`")]
    UserRequired,

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_)
            | Error::InvalidConfig(_)
            | Error::TaskNotFound(_)
            | Error::UserRequired => exit_codes::USER_ERROR,

            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }
}

/// Result type alias for questlog operations
pub type Result<T> = std::result::Result<T, Error>;
