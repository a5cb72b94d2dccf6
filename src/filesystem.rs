//! Filesystem Collaborator
//!
//! The engine never touches disk or network directly; all reads go through
//! a [`Filesystem`] so builds can be driven from memory in tests.

use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilesystemError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Remote fetch failed for {url}: {message}")]
    Remote { url: String, message: String },
}

impl FilesystemError {
    fn from_io(path: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path.to_string())
        } else {
            Self::Io {
                path: path.to_string(),
                source,
            }
        }
    }
}

pub trait Filesystem: Send + Sync {
    /// Last modification time as a unix timestamp
    fn last_modified(&self, path: &str) -> Result<i64, FilesystemError>;

    /// Read a local file
    fn get_contents(&self, path: &str) -> Result<String, FilesystemError>;

    /// Fetch a remote resource
    fn get_remote(&self, url: &str) -> Result<String, FilesystemError>;
}

/// Reads from the local disk. Remote fetches need the `remote` feature.
#[derive(Debug, Clone, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }
}

impl Filesystem for LocalFilesystem {
    fn last_modified(&self, path: &str) -> Result<i64, FilesystemError> {
        let modified = fs::metadata(Path::new(path))
            .and_then(|meta| meta.modified())
            .map_err(|e| FilesystemError::from_io(path, e))?;
        Ok(DateTime::<Utc>::from(modified).timestamp())
    }

    fn get_contents(&self, path: &str) -> Result<String, FilesystemError> {
        fs::read_to_string(Path::new(path)).map_err(|e| FilesystemError::from_io(path, e))
    }

    #[cfg(feature = "remote")]
    fn get_remote(&self, url: &str) -> Result<String, FilesystemError> {
        // Protocol-relative URLs have no scheme to inherit here
        let url = match url.strip_prefix("//") {
            Some(rest) => format!("https://{}", rest),
            None => url.to_string(),
        };

        let remote_err = |e: reqwest::Error| FilesystemError::Remote {
            url: url.clone(),
            message: e.to_string(),
        };

        reqwest::blocking::get(&url)
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .map_err(remote_err)
    }

    #[cfg(not(feature = "remote"))]
    fn get_remote(&self, url: &str) -> Result<String, FilesystemError> {
        Err(FilesystemError::Remote {
            url: url.to_string(),
            message: "remote fetching requires the `remote` feature".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reads_local_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("app.css");
        fs::write(&file, "body {}").unwrap();

        let files = LocalFilesystem::new();
        let path = file.to_str().unwrap();
        assert_eq!(files.get_contents(path).unwrap(), "body {}");
        assert!(files.last_modified(path).unwrap() > 0);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.css");

        let files = LocalFilesystem::new();
        let err = files.get_contents(missing.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, FilesystemError::NotFound(_)));

        let err = files.last_modified(missing.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, FilesystemError::NotFound(_)));
    }

    #[cfg(not(feature = "remote"))]
    #[test]
    fn test_remote_disabled_without_feature() {
        let err = LocalFilesystem::new()
            .get_remote("http://foo.com/bar.css")
            .unwrap_err();
        assert!(err.to_string().contains("remote"));
    }
}
