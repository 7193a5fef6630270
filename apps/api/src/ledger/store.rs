//! Application ledger: in-memory table backed by the master CSV and one
//! snapshot CSV per day.
//!
//! Every mutation rewrites the master file in full, then rewrites the
//! snapshot of the affected day so it holds exactly that day's rows.
//! A failed write rolls the in-memory table back and rewrites the files
//! that may already have been replaced from the restored table.

use std::fs;
use std::io;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ledger::models::{Application, ApplicationRecord, ApplicationStatus, ApplicationUpdate};
use crate::storage::{read_optional, write_atomic, DataPaths, StorageError, SNAPSHOT_SUFFIX};

pub const COLUMNS: [&str; 7] = [
    "Date", "Platform", "Company", "Job Link", "Status", "Notes", "Resume",
];

/// CSV shape of a ledger row; column names match the legacy files.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Platform")]
    platform: String,
    #[serde(rename = "Company")]
    company: String,
    #[serde(rename = "Job Link")]
    job_link: String,
    #[serde(rename = "Status")]
    status: ApplicationStatus,
    #[serde(rename = "Notes")]
    notes: String,
    #[serde(rename = "Resume")]
    resume: Option<String>,
}

impl From<&Application> for CsvRow {
    fn from(app: &Application) -> Self {
        CsvRow {
            date: app.date,
            platform: app.platform.clone(),
            company: app.company.clone(),
            job_link: app.job_link.clone(),
            status: app.status,
            notes: app.notes.clone(),
            resume: app.resume.clone(),
        }
    }
}

impl From<CsvRow> for Application {
    fn from(row: CsvRow) -> Self {
        Application {
            date: row.date,
            platform: row.platform,
            company: row.company,
            job_link: row.job_link,
            status: row.status,
            notes: row.notes,
            resume: row.resume.filter(|r| !r.is_empty()),
        }
    }
}

fn encode_csv<'a>(
    path: &Path,
    rows: impl IntoIterator<Item = &'a Application>,
) -> Result<Vec<u8>, StorageError> {
    // Header written by hand so an empty ledger still carries its columns.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(COLUMNS)
        .map_err(|e| StorageError::csv(path, e))?;
    for app in rows {
        writer
            .serialize(CsvRow::from(app))
            .map_err(|e| StorageError::csv(path, e))?;
    }
    writer
        .into_inner()
        .map_err(|e| StorageError::io(path, e.into_error()))
}

fn decode_csv(path: &Path, bytes: &[u8]) -> Result<Vec<Application>, StorageError> {
    let mut reader = csv::Reader::from_reader(bytes);
    reader
        .deserialize::<CsvRow>()
        .map(|row| row.map(Application::from).map_err(|e| StorageError::csv(path, e)))
        .collect()
}

pub struct Ledger {
    paths: DataPaths,
    records: Vec<ApplicationRecord>,
}

impl Ledger {
    /// Loads the master CSV; a missing file is an empty ledger.
    pub fn load(paths: DataPaths) -> Result<Self, StorageError> {
        let path = paths.ledger();
        let records: Vec<ApplicationRecord> = match read_optional(&path)? {
            Some(bytes) => decode_csv(&path, &bytes)?
                .into_iter()
                .map(ApplicationRecord::new)
                .collect(),
            None => Vec::new(),
        };
        info!("Loaded {} applications from {}", records.len(), path.display());
        Ok(Self { paths, records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in file order (oldest first).
    #[cfg(test)]
    pub fn records(&self) -> &[ApplicationRecord] {
        &self.records
    }

    /// Reverse-chronological view used by the history listing.
    pub fn newest_first(&self) -> impl Iterator<Item = &ApplicationRecord> {
        self.records.iter().rev()
    }

    pub fn get(&self, id: Uuid) -> Option<&ApplicationRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn append(&mut self, application: Application) -> Result<ApplicationRecord, AppError> {
        let date = application.date;
        let record = ApplicationRecord::new(application);
        self.records.push(record.clone());
        if let Err(e) = self.persist(date) {
            self.records.pop();
            self.restore_files(date);
            return Err(e.into());
        }
        info!(
            "Logged application {} to {} on {date}",
            record.id, record.application.company
        );
        Ok(record)
    }

    pub fn update(
        &mut self,
        id: Uuid,
        update: ApplicationUpdate,
    ) -> Result<ApplicationRecord, AppError> {
        let pos = self.position(id)?;
        let previous = self.records[pos].application.clone();
        update.apply(&mut self.records[pos].application);
        let record = self.records[pos].clone();
        let date = record.application.date;
        if let Err(e) = self.persist(date) {
            self.records[pos].application = previous;
            self.restore_files(date);
            return Err(e.into());
        }
        info!("Updated application {id}");
        Ok(record)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<ApplicationRecord, AppError> {
        let pos = self.position(id)?;
        let removed = self.records.remove(pos);
        let date = removed.application.date;
        if let Err(e) = self.persist(date) {
            self.records.insert(pos, removed);
            self.restore_files(date);
            return Err(e.into());
        }
        info!("Deleted application {id}");
        Ok(removed)
    }

    fn position(&self, id: Uuid) -> Result<usize, AppError> {
        self.records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))
    }

    /// Reads the day's snapshot file from disk. `None` when no snapshot exists.
    pub fn query_by_date(&self, date: NaiveDate) -> Result<Option<Vec<Application>>, AppError> {
        let path = self.paths.snapshot(&date.to_string());
        match read_optional(&path)? {
            Some(bytes) => Ok(Some(decode_csv(&path, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Dates with a snapshot file in the logs directory, ascending.
    pub fn available_dates(&self) -> Result<Vec<NaiveDate>, AppError> {
        let dir = self.paths.logs_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&dir, e).into()),
        };

        let mut dates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&dir, e))?;
            let name = entry.file_name();
            let Some(date) = name
                .to_str()
                .and_then(|n| n.strip_suffix(SNAPSHOT_SUFFIX))
                .and_then(|d| d.parse::<NaiveDate>().ok())
            else {
                continue;
            };
            dates.push(date);
        }
        dates.sort();
        Ok(dates)
    }

    /// Rewrites the master file only.
    pub fn save_master(&self) -> Result<(), StorageError> {
        let path = self.paths.ledger();
        let bytes = encode_csv(&path, self.records.iter().map(|r| &r.application))?;
        write_atomic(&path, &bytes)
    }

    fn write_snapshot(&self, date: NaiveDate) -> Result<(), StorageError> {
        let path = self.paths.snapshot(&date.to_string());
        let day = self
            .records
            .iter()
            .map(|r| &r.application)
            .filter(|a| a.date == date);
        let bytes = encode_csv(&path, day)?;
        write_atomic(&path, &bytes)
    }

    fn persist(&self, date: NaiveDate) -> Result<(), StorageError> {
        self.save_master()?;
        self.write_snapshot(date)
    }

    /// Rewrites the master file, and the day's snapshot if one exists, from
    /// the restored table after a failed `persist`.
    fn restore_files(&self, date: NaiveDate) {
        if let Err(e) = self.save_master() {
            warn!("Could not restore master ledger file: {e}");
        }
        if self.paths.snapshot(&date.to_string()).is_file() {
            if let Err(e) = self.write_snapshot(date) {
                warn!("Could not restore snapshot for {date}: {e}");
            }
        }
    }
}
