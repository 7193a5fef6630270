//! Resume file store. Uploads land in one flat directory under a name
//! derived from the application date, company and original filename.

pub mod handlers;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::storage::{write_atomic, StorageError, UPLOAD_DIR};

/// A resume written by `ResumeStore::save`.
#[derive(Debug)]
pub struct StoredResume {
    pub path: String,
    file: PathBuf,
    replaced: bool,
}

impl StoredResume {
    /// Removes the upload again when its application could not be recorded.
    /// A file that overwrote an earlier upload is kept.
    pub fn discard(self) {
        if self.replaced {
            return;
        }
        match fs::remove_file(&self.file) {
            Ok(()) => info!("Discarded resume {}", self.path),
            Err(e) => warn!("Could not discard resume {}: {e}", self.path),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResumeStore {
    dir: PathBuf,
}

impl ResumeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes the upload. The returned `path` is what the ledger records
    /// (`uploaded_resumes/<file name>`). An existing file with the same
    /// derived name is overwritten.
    pub fn save(
        &self,
        date: NaiveDate,
        company: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<StoredResume, AppError> {
        let name = stored_file_name(date, company, filename)?;
        let file = self.dir.join(&name);
        let replaced = file.exists();
        write_atomic(&file, bytes)?;
        info!("Stored resume {name} ({} bytes)", bytes.len());
        Ok(StoredResume {
            path: format!("{UPLOAD_DIR}/{name}"),
            file,
            replaced,
        })
    }

    /// Reads a stored resume by file name. Accepts a bare name or the
    /// `uploaded_resumes/` path kept in the ledger.
    pub fn open(&self, name: &str) -> Result<Vec<u8>, AppError> {
        let name = name
            .strip_prefix(&format!("{UPLOAD_DIR}/"))
            .unwrap_or(name);
        if !is_plain_file_name(name) {
            return Err(AppError::Validation(format!("invalid resume name '{name}'")));
        }

        let path = self.dir.join(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(AppError::NotFound(format!("Resume {name} not found")))
            }
            Err(e) => Err(StorageError::io(&path, e).into()),
        }
    }
}

/// `<date>_<company>_<filename>` with spaces in the company replaced by
/// underscores. Separators are replaced too and the filename is reduced to
/// its last component, so the result always stays inside the upload dir.
pub fn stored_file_name(
    date: NaiveDate,
    company: &str,
    filename: &str,
) -> Result<String, AppError> {
    let company: String = company
        .chars()
        .map(|c| if c == ' ' || c == '/' || c == '\\' { '_' } else { c })
        .collect();

    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    if !is_plain_file_name(base) {
        return Err(AppError::Validation(format!(
            "invalid upload filename '{filename}'"
        )));
    }

    Ok(format!("{date}_{company}_{base}"))
}

/// Uploads are limited to PDF files.
pub fn is_pdf(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}
