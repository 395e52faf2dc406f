//! Filesystem error taxonomy
//!
//! Every failure a request can hit while touching the filesystem. Handlers map
//! each variant to a status code at the service boundary.

use std::io;
use thiserror::Error;

/// Errors produced while resolving or reading a requested path.
///
/// The `Display` text of the not-found variants is the exact message sent to
/// browser clients.
///
/// # Examples
///
/// ```
/// use file_bridge::files::FsError;
///
/// let err = FsError::NotADirectory;
/// assert_eq!(err.to_string(), "Not a directory");
/// assert!(!err.is_not_found());
/// ```
#[derive(Error, Debug)]
pub enum FsError {
    /// Listing target does not exist
    #[error("Directory does not exist")]
    DirectoryNotFound,

    /// Listing target exists but is a file
    #[error("Not a directory")]
    NotADirectory,

    /// File to serve does not exist or is not a regular file
    #[error("File not found")]
    FileNotFound,

    /// Canonical path escapes the configured root
    #[error("Path is outside the allowed root: {path}")]
    OutsideRoot {
        /// The path as requested
        path: String,
    },

    /// Path cannot be used at all (empty, embedded NUL)
    #[error("Invalid path: {reason}")]
    InvalidPath {
        /// Why the path was rejected
        reason: &'static str,
    },

    /// Any other I/O failure, message kept verbatim
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl FsError {
    /// Returns `true` for the not-found variants and raw `NotFound` I/O errors.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::DirectoryNotFound | Self::FileNotFound => true,
            Self::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Returns `true` when the OS refused access.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::PermissionDenied)
    }

    /// Replace a raw not-found I/O error with the operation-specific variant.
    #[must_use]
    pub fn or_not_found(self, not_found: Self) -> Self {
        if self.is_not_found() {
            not_found
        } else {
            self
        }
    }
}
