//! Error types for sandsh

use thiserror::Error;

/// Result type alias for shell operations
pub type ShellResult<T> = Result<T, ShellError>;

/// Error types for shell operations
#[derive(Error, Debug)]
pub enum ShellError {
    /// Parse error in shell input
    #[error("Parse error: {0}")]
    Parse(String),

    /// Runtime error during script execution
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// IO error (output sinks, history file, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Filesystem error from the sandbox VFS
    #[error("{0}")]
    Fs(#[from] sandsh_vfs::VfsError),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Exit requested (not really an error)
    #[error("Exit with code {0}")]
    Exit(i32),
}
