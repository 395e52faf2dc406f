//! Read-only filesystem operations
//!
//! One function per request kind. Each opens its own handle, which is dropped
//! when the function (or the returned `OpenedFile`) goes out of scope.

use std::io::SeekFrom;
use std::path::Path;
use std::time::SystemTime;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};

use crate::logger;

use super::FsError;

/// Read a whole file as UTF-8 text.
///
/// Directories, missing files and invalid UTF-8 all surface as `FsError::Io`
/// carrying the OS/decoder message.
pub async fn read_text(path: &Path) -> Result<String, FsError> {
    Ok(fs::read_to_string(path).await?)
}

/// List entry names of a directory, in the order the OS yields them.
/// Names that are not valid UTF-8 are left out.
pub async fn list_dir(path: &Path) -> Result<Vec<String>, FsError> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|e| FsError::from(e).or_not_found(FsError::DirectoryNotFound))?;
    if !metadata.is_dir() {
        return Err(FsError::NotADirectory);
    }

    let mut entries = fs::read_dir(path).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        // A lossy name could never be requested back through a URL
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => logger::log_debug(&format!(
                "Skipping non-UTF-8 entry {raw:?} in {}",
                path.display()
            )),
        }
    }
    Ok(names)
}

/// An open regular file with the metadata needed for response headers
pub struct OpenedFile {
    file: File,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

/// Open a regular file for serving. Anything that is not a regular file
/// (missing, directory, socket) is `FileNotFound`.
pub async fn open_file(path: &Path) -> Result<OpenedFile, FsError> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|e| FsError::from(e).or_not_found(FsError::FileNotFound))?;
    if !metadata.is_file() {
        return Err(FsError::FileNotFound);
    }

    let file = File::open(path)
        .await
        .map_err(|e| FsError::from(e).or_not_found(FsError::FileNotFound))?;

    Ok(OpenedFile {
        file,
        len: metadata.len(),
        modified: metadata.modified().ok(),
    })
}

impl OpenedFile {
    /// Reader over `len` bytes starting at `start`. Nothing is read until
    /// the reader is polled.
    pub async fn into_reader(mut self, start: u64, len: u64) -> Result<Take<File>, FsError> {
        if start > 0 {
            self.file.seek(SeekFrom::Start(start)).await?;
        }
        Ok(self.file.take(len))
    }
}
