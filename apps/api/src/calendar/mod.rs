//! Calendar reminders, persisted as a JSON array.

pub mod handlers;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::storage::{read_optional, write_atomic, DataPaths, StorageError};

const TIMESTAMP_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarEvent {
    /// Entries written before ids existed get a fresh one on load.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub title: String,
    /// `<YYYY-MM-DD>T<HH:MM:SS>`
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub note: String,
}

impl CalendarEvent {
    /// Date portion of `start`, as shown in the upcoming list.
    pub fn day(&self) -> &str {
        self.start.get(..10).unwrap_or(&self.start)
    }

    pub fn label(&self) -> String {
        format!("{} on {}", self.title, self.day())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    /// Defaults to the start time.
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub note: String,
}

fn timestamp(date: NaiveDate, time: NaiveTime) -> String {
    format!("{date}T{}", time.format(TIMESTAMP_FORMAT))
}

/// Events ordered by `start`, ascending. Finite and cloneable, so callers can
/// restart iteration from any point.
#[derive(Debug, Clone)]
pub struct SortedEvents<'a> {
    inner: std::vec::IntoIter<&'a CalendarEvent>,
}

impl<'a> Iterator for SortedEvents<'a> {
    type Item = &'a CalendarEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for SortedEvents<'_> {}

pub struct CalendarStore {
    paths: DataPaths,
    events: Vec<CalendarEvent>,
}

impl CalendarStore {
    pub fn load(paths: DataPaths) -> Result<Self, StorageError> {
        let path = paths.events();
        let events: Vec<CalendarEvent> = match read_optional(&path)? {
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| StorageError::json(&path, e))?
            }
            None => Vec::new(),
        };
        info!("Loaded {} calendar events from {}", events.len(), path.display());
        Ok(Self { paths, events })
    }

    pub fn add(&mut self, new: NewEvent) -> Result<CalendarEvent, AppError> {
        if new.title.trim().is_empty() {
            return Err(AppError::Validation("event title cannot be empty".to_string()));
        }
        let start = timestamp(new.date, new.time);
        let end = timestamp(new.date, new.end_time.unwrap_or(new.time));
        if end < start {
            return Err(AppError::Validation(
                "event end must not precede its start".to_string(),
            ));
        }

        let event = CalendarEvent {
            id: Uuid::new_v4(),
            title: new.title,
            start,
            end,
            note: new.note,
        };
        self.events.push(event.clone());
        if let Err(e) = self.persist() {
            self.events.pop();
            return Err(e.into());
        }
        info!("Added event {} ({})", event.id, event.label());
        Ok(event)
    }

    pub fn remove(&mut self, id: Uuid) -> Result<CalendarEvent, AppError> {
        let pos = self
            .events
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Event {id} not found")))?;
        let removed = self.events.remove(pos);
        if let Err(e) = self.persist() {
            self.events.insert(pos, removed);
            return Err(e.into());
        }
        info!("Removed event {id}");
        Ok(removed)
    }

    /// Lexicographic order on the `start` string; ties keep insertion order.
    pub fn list_sorted(&self) -> SortedEvents<'_> {
        let mut sorted: Vec<&CalendarEvent> = self.events.iter().collect();
        sorted.sort_by(|a, b| a.start.cmp(&b.start));
        SortedEvents {
            inner: sorted.into_iter(),
        }
    }

    fn persist(&self) -> Result<(), StorageError> {
        let path = self.paths.events();
        let bytes =
            serde_json::to_vec(&self.events).map_err(|e| StorageError::json(&path, e))?;
        write_atomic(&path, &bytes)
    }
}
