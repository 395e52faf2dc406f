//! Request path resolution
//!
//! Turns a caller-supplied path string into the filesystem path to operate on.
//! Relative input joins onto the base directory; absolute input is used as-is.
//! With a configured root, the result is canonicalized and must stay inside it.

use std::io;
use std::path::{Path, PathBuf};

use super::FsError;
use crate::config::AccessConfig;

#[derive(Debug, Clone)]
pub struct PathGuard {
    base: PathBuf,
    /// Canonical root, `None` means unrestricted
    root: Option<PathBuf>,
}

impl PathGuard {
    /// Resolve against `base` without any confinement.
    pub fn unrestricted(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            root: None,
        }
    }

    /// Confine every resolved path to `root`, which also becomes the base.
    pub fn confined(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("access root is not a directory: {}", root.display()),
            ));
        }

        Ok(Self {
            base: root.clone(),
            root: Some(root),
        })
    }

    /// Build from configuration: confined when `access.root` is set,
    /// otherwise unrestricted relative to the current working directory.
    pub fn from_config(access: &AccessConfig) -> io::Result<Self> {
        match access.root.as_deref() {
            Some(root) if !root.is_empty() => Self::confined(root),
            _ => Ok(Self::unrestricted(std::env::current_dir()?)),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub const fn is_confined(&self) -> bool {
        self.root.is_some()
    }

    /// Resolve a single path string.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, FsError> {
        validate(raw)?;
        self.confine(self.base.join(raw), raw)
    }

    /// Resolve a directory component and a file name separately.
    /// An empty directory component means the base directory.
    pub fn resolve_file(&self, dir: &str, name: &str) -> Result<PathBuf, FsError> {
        validate(name)?;
        if dir.contains('\0') {
            return Err(FsError::InvalidPath {
                reason: "embedded NUL byte",
            });
        }

        let parent = if dir.is_empty() {
            self.base.clone()
        } else {
            self.base.join(dir)
        };
        let requested = if dir.is_empty() {
            name.to_string()
        } else {
            format!("{dir}/{name}")
        };
        self.confine(parent.join(name), &requested)
    }

    fn confine(&self, joined: PathBuf, requested: &str) -> Result<PathBuf, FsError> {
        let Some(root) = &self.root else {
            return Ok(joined);
        };

        // Missing paths surface as NotFound I/O errors for the caller to classify
        let canonical = joined.canonicalize()?;
        if canonical.starts_with(root) {
            Ok(canonical)
        } else {
            Err(FsError::OutsideRoot {
                path: requested.to_string(),
            })
        }
    }
}

fn validate(raw: &str) -> Result<(), FsError> {
    if raw.is_empty() {
        return Err(FsError::InvalidPath { reason: "empty path" });
    }
    if raw.contains('\0') {
        return Err(FsError::InvalidPath {
            reason: "embedded NUL byte",
        });
    }
    Ok(())
}
