use thiserror::Error;

/// Filesystem errors, named after the POSIX errno each one maps to.
///
/// These are raised by [`crate::Vfs`] operations and converted to
/// `command: message` diagnostics at the shell's builtin layer; they never
/// escape as panics.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VfsError {
    /// ENOENT
    #[error("{0}: No such file or directory")]
    NotFound(String),

    /// EISDIR
    #[error("{0}: Is a directory")]
    IsDirectory(String),

    /// ENOTDIR
    #[error("{0}: Not a directory")]
    NotDirectory(String),

    /// EEXIST
    #[error("{0}: File exists")]
    AlreadyExists(String),

    /// ENOTEMPTY
    #[error("{0}: Directory not empty")]
    NotEmpty(String),

    /// EINVAL
    #[error("{0}: Invalid argument")]
    InvalidArgument(String),
}

impl VfsError {
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    #[must_use]
    pub fn is_directory(path: impl Into<String>) -> Self {
        Self::IsDirectory(path.into())
    }

    #[must_use]
    pub fn not_directory(path: impl Into<String>) -> Self {
        Self::NotDirectory(path.into())
    }

    #[must_use]
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    #[must_use]
    pub fn not_empty(path: impl Into<String>) -> Self {
        Self::NotEmpty(path.into())
    }

    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// The errno name for this error, e.g. `"ENOENT"`.
    #[must_use]
    pub fn errno(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "ENOENT",
            Self::IsDirectory(_) => "EISDIR",
            Self::NotDirectory(_) => "ENOTDIR",
            Self::AlreadyExists(_) => "EEXIST",
            Self::NotEmpty(_) => "ENOTEMPTY",
            Self::InvalidArgument(_) => "EINVAL",
        }
    }
}

pub type VfsResult<T> = Result<T, VfsError>;
