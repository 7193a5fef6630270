use std::sync::Arc;

use tokio::sync::RwLock;

use crate::auth::{Authenticator, SessionStore, StaticCredentials};
use crate::calendar::CalendarStore;
use crate::config::Config;
use crate::ledger::Ledger;
use crate::resumes::ResumeStore;
use crate::storage::{DataPaths, StorageError};
use crate::summary::SummaryStore;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Each store is loaded once and guarded by its own lock; handlers that need
/// both take the ledger before the summaries.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable credential check. Default: the built-in static table.
    pub authenticator: Arc<dyn Authenticator>,
    pub sessions: SessionStore,
    pub ledger: Arc<RwLock<Ledger>>,
    pub summaries: Arc<RwLock<SummaryStore>>,
    pub calendar: Arc<RwLock<CalendarStore>>,
    pub resumes: ResumeStore,
}

impl AppState {
    /// Creates the data directory layout and loads every store from it.
    /// Missing files start as empty stores.
    pub fn open(config: &Config) -> Result<Self, StorageError> {
        let paths = DataPaths::new(&config.data_dir);
        paths.ensure_dirs()?;

        Ok(AppState {
            authenticator: Arc::new(StaticCredentials::builtin()),
            sessions: SessionStore::new(),
            ledger: Arc::new(RwLock::new(Ledger::load(paths.clone())?)),
            summaries: Arc::new(RwLock::new(SummaryStore::load(paths.clone())?)),
            calendar: Arc::new(RwLock::new(CalendarStore::load(paths.clone())?)),
            resumes: ResumeStore::new(paths.upload_dir()),
        })
    }
}
