//! Flat-file layout of the data directory and the atomic write primitive
//! every store persists through.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

pub const LEDGER_FILE: &str = "job_applications.csv";
pub const SUMMARY_FILE: &str = "daily_summary.json";
pub const EVENTS_FILE: &str = "calendar_events.json";
pub const UPLOAD_DIR: &str = "uploaded_resumes";
pub const LOGS_DIR: &str = "logs";
pub const SNAPSHOT_SUFFIX: &str = "_applications.csv";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn csv(path: &Path, source: csv::Error) -> Self {
        StorageError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn json(path: &Path, source: serde_json::Error) -> Self {
        StorageError::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Resolved locations of every tracker file under one data directory.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the upload and log directories. The root must be creatable too.
    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        for dir in [self.root.clone(), self.upload_dir(), self.logs_dir()] {
            fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        }
        Ok(())
    }

    pub fn ledger(&self) -> PathBuf {
        self.root.join(LEDGER_FILE)
    }

    pub fn summary(&self) -> PathBuf {
        self.root.join(SUMMARY_FILE)
    }

    pub fn events(&self) -> PathBuf {
        self.root.join(EVENTS_FILE)
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.root.join(UPLOAD_DIR)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(LOGS_DIR)
    }

    /// `logs/<date>_applications.csv`
    pub fn snapshot(&self, date: &str) -> PathBuf {
        self.logs_dir().join(format!("{date}{SNAPSHOT_SUFFIX}"))
    }
}

/// Replaces `path` with `bytes` by writing a sibling temp file and renaming it
/// over the target. On failure the previous contents stay in place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| StorageError::io(path, e))?;
    tmp.write_all(bytes).map_err(|e| StorageError::io(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StorageError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| StorageError::io(path, e.error))?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Reads a file, mapping "not found" to `None` so absent stores start empty.
pub fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::io(path, e)),
    }
}
