//! Daily summary store: per-day platform counts and checklist, persisted as
//! one JSON document keyed by ISO date.
//!
//! Edits stay in memory until `save()`. Logging an application and the
//! explicit export both save; count and checklist edits on their own do not.

pub mod handlers;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::storage::{read_optional, write_atomic, DataPaths, StorageError};

/// Checklist tasks every new day starts with, all unchecked.
pub const DEFAULT_CHECKLIST: [&str; 6] = [
    "resume_custom",
    "cover_custom",
    "networking_1",
    "networking_2",
    "tracker_update",
    "followup_marked",
];

/// Built-in platforms and the highest count each accepts per day.
/// Platforms outside this list take any count.
pub const PLATFORM_LIMITS: [(&str, u32); 5] = [
    ("LinkedIn", 20),
    ("Handshake", 10),
    ("Indeed", 20),
    ("Wellfound / ZipRecruiter", 10),
    ("Company Sites", 10),
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailySummary {
    #[serde(default)]
    pub counts: BTreeMap<String, u32>,
    #[serde(default)]
    pub checklist: BTreeMap<String, bool>,
}

impl Default for DailySummary {
    fn default() -> Self {
        Self {
            counts: BTreeMap::new(),
            checklist: DEFAULT_CHECKLIST
                .iter()
                .map(|task| (task.to_string(), false))
                .collect(),
        }
    }
}

impl DailySummary {
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }
}

/// Human label for a checklist key: `networking_1` → `Networking 1`.
pub fn checklist_label(task: &str) -> String {
    let spaced = task.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn platform_limit(platform: &str) -> Option<u32> {
    PLATFORM_LIMITS
        .iter()
        .find(|(name, _)| *name == platform)
        .map(|(_, max)| *max)
}

pub struct SummaryStore {
    paths: DataPaths,
    days: BTreeMap<NaiveDate, DailySummary>,
    dirty: bool,
}

impl SummaryStore {
    pub fn load(paths: DataPaths) -> Result<Self, StorageError> {
        let path = paths.summary();
        let days = match read_optional(&path)? {
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| StorageError::json(&path, e))?
            }
            None => BTreeMap::new(),
        };
        info!("Loaded {} daily summaries from {}", days.len(), path.display());
        Ok(Self {
            paths,
            days,
            dirty: false,
        })
    }

    /// Returns the day's entry, creating the default one in memory if missing.
    pub fn get_or_create(&mut self, date: NaiveDate) -> &mut DailySummary {
        self.days.entry(date).or_default()
    }

    #[cfg(test)]
    pub fn get(&self, date: NaiveDate) -> Option<&DailySummary> {
        self.days.get(&date)
    }

    /// Merges platform counts into the day. Names are trimmed first;
    /// built-in platforms are capped at their limit and two names that trim
    /// to the same platform are rejected. Nothing is applied if any entry
    /// is invalid.
    pub fn set_counts(
        &mut self,
        date: NaiveDate,
        counts: BTreeMap<String, u32>,
    ) -> Result<&DailySummary, AppError> {
        let mut trimmed = BTreeMap::new();
        for (platform, count) in &counts {
            let platform = platform.trim();
            if platform.is_empty() {
                return Err(AppError::Validation(
                    "platform name cannot be empty".to_string(),
                ));
            }
            if let Some(max) = platform_limit(platform) {
                if *count > max {
                    return Err(AppError::Validation(format!(
                        "{platform} count must be between 0 and {max}"
                    )));
                }
            }
            if trimmed.insert(platform.to_string(), *count).is_some() {
                return Err(AppError::Validation(format!(
                    "platform '{platform}' given more than once"
                )));
            }
        }

        let day = self.days.entry(date).or_default();
        day.counts.extend(trimmed);
        self.dirty = true;
        Ok(day)
    }

    /// Sets checklist tasks for the day. Only tasks already on the day's
    /// checklist can be set.
    pub fn set_checklist(
        &mut self,
        date: NaiveDate,
        items: BTreeMap<String, bool>,
    ) -> Result<&DailySummary, AppError> {
        let day = self.days.entry(date).or_default();
        if let Some(unknown) = items.keys().find(|k| !day.checklist.contains_key(*k)) {
            return Err(AppError::Validation(format!(
                "unknown checklist task '{unknown}'"
            )));
        }
        day.checklist.extend(items);
        self.dirty = true;
        Ok(day)
    }

    /// True when counts or checklist changed since the last save.
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    /// Writes the whole document.
    pub fn save(&mut self) -> Result<(), StorageError> {
        let path = self.paths.summary();
        let bytes = serde_json::to_vec(&self.days).map_err(|e| StorageError::json(&path, e))?;
        write_atomic(&path, &bytes)?;
        self.dirty = false;
        info!("Saved {} daily summaries", self.days.len());
        Ok(())
    }
}
