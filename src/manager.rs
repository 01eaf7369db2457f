// File: ./src/manager.rs
// The calendar façade: validates drafts, assigns ids, runs the scheduling
// rules against the store, and persists after every mutation.
use crate::config::Config;
use crate::engine;
use crate::model::codec;
use crate::model::{AdditionalInfo, Event, EventId, Recurrence, RecurrenceInterval};
use crate::storage::StorePaths;
use crate::store::{EventStore, LoadReport};
use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use log::{debug, error, info, warn};
use std::path::Path;
use thiserror::Error;

/// Why a draft was turned away.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    /// The requested slot overlaps an existing event (half-open intervals,
    /// so back-to-back bookings are fine). Carries the blocking event.
    #[error("conflicts with \"{title}\" ({start} to {end})")]
    Conflict {
        title: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    /// The draft ends at or before its own start.
    #[error("event must end after it starts ({start} to {end})")]
    InvalidInterval {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

/// Caller-supplied description of an event, before an id is assigned.
/// Location and category are optional; an extension record is only stored
/// when at least one of them is given, and a recurrence record only when the
/// interval is not `None`.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub interval: RecurrenceInterval,
    pub times: u32,
    pub until: Option<NaiveDate>,
    pub location: Option<String>,
    pub category: Option<String>,
}

impl EventDraft {
    pub fn new(title: &str, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            title: title.to_string(),
            description: String::new(),
            start,
            end,
            interval: RecurrenceInterval::None,
            times: 0,
            until: None,
            location: None,
            category: None,
        }
    }
}

pub struct CalendarManager {
    paths: StorePaths,
    store: EventStore,
    last_load: LoadReport,
}

impl CalendarManager {
    /// Opens the store at the configured (or platform default) location and
    /// loads whatever is there; a damaged store loads partially and the
    /// damage is kept in `load_report`.
    pub fn open(config: &Config) -> Result<Self> {
        let paths = StorePaths::resolve(config.data_dir.as_deref())
            .context("no usable data directory; set data_dir in the config or FLATCAL_DATA_DIR")?;
        Ok(Self::with_paths(paths))
    }

    pub fn with_paths(paths: StorePaths) -> Self {
        let (store, last_load) = EventStore::load(&paths);
        if last_load.is_clean() {
            info!("loaded {} events from {}", store.len(), paths.dir().display());
        } else {
            warn!(
                "loaded {} events from {} ({} rows skipped, {} file errors)",
                store.len(),
                paths.dir().display(),
                last_load.skipped.len(),
                last_load.errors.len()
            );
        }
        Self {
            paths,
            store,
            last_load,
        }
    }

    /// Outcome of the most recent load (open, refresh, or restore).
    pub fn load_report(&self) -> &LoadReport {
        &self.last_load
    }

    /// Discards in-memory state and re-reads the tables from disk.
    pub fn refresh(&mut self) {
        let (store, report) = EventStore::load(&self.paths);
        self.store = store;
        self.last_load = report;
    }

    // --- Mutations ---

    /// Validates the draft, rejects it on a slot conflict, then assigns the
    /// next id (`max(existing) + 1`) and persists. A deleted id below the
    /// maximum is never handed out again, so ids are not dense. Timestamps
    /// are floored to the minute first (the tables keep no seconds), and the
    /// interval and conflict checks run on the floored values.
    pub fn create_event(&mut self, draft: &EventDraft) -> Result<EventId, ScheduleError> {
        let (start, end) = (codec::minute_floor(draft.start), codec::minute_floor(draft.end));
        if end <= start {
            return Err(ScheduleError::InvalidInterval { start, end });
        }
        if let Some(existing) = engine::find_conflict(start, end, self.store.events()) {
            return Err(ScheduleError::Conflict {
                title: existing.title.clone(),
                start: existing.start,
                end: existing.end,
            });
        }

        let id = self.store.next_id();
        let (event, recurrence, info) = materialize(id, draft);
        info!("created event {id} \"{}\"", event.title);
        self.store.insert(event, recurrence, info);
        self.persist();
        Ok(id)
    }

    /// Rewrites the event with `id` from the draft, dropping and recreating
    /// its extension records. An unknown id is a no-op, not an error, so a
    /// stale caller cannot plant extension rows for a deleted event. Updates
    /// skip the conflict check: rescheduling an event around its own old
    /// slot must not be blocked by that slot.
    pub fn update_event(&mut self, id: EventId, draft: &EventDraft) -> Result<(), ScheduleError> {
        if self.store.event(id).is_none() {
            debug!("update of unknown event {id} ignored");
            return Ok(());
        }
        let (start, end) = (codec::minute_floor(draft.start), codec::minute_floor(draft.end));
        if end <= start {
            return Err(ScheduleError::InvalidInterval { start, end });
        }

        let (event, recurrence, info) = materialize(id, draft);
        self.store.replace(id, event, recurrence, info);
        info!("updated event {id}");
        self.persist();
        Ok(())
    }

    /// Removes the event and everything attached to it. Returns whether the
    /// id existed.
    pub fn delete_event(&mut self, id: EventId) -> bool {
        if !self.store.remove(id) {
            debug!("delete of unknown event {id} ignored");
            return false;
        }
        info!("deleted event {id}");
        self.persist();
        true
    }

    // --- Views ---

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.store.events()
    }

    pub fn event(&self, id: EventId) -> Option<&Event> {
        self.store.event(id)
    }

    pub fn recurrence(&self, id: EventId) -> Option<&Recurrence> {
        self.store.recurrence(id)
    }

    pub fn additional_info(&self, id: EventId) -> Option<&AdditionalInfo> {
        self.store.additional_info(id)
    }

    /// Events occurring on `date`, recurrence expanded, in id order.
    pub fn events_on(&self, date: NaiveDate) -> Vec<&Event> {
        self.store
            .events()
            .filter(|event| engine::occurs_on(event, self.store.recurrence(event.id), date))
            .collect()
    }

    /// Days of the given month with at least one (possibly recurring) event.
    pub fn occupied_dates(&self, year: i32, month: u32) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
            return dates;
        };
        let mut day = first;
        while day.year() == year && day.month() == month {
            if self.has_events_on(day) {
                dates.push(day);
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        dates
    }

    fn has_events_on(&self, date: NaiveDate) -> bool {
        self.store
            .events()
            .any(|event| engine::occurs_on(event, self.store.recurrence(event.id), date))
    }

    /// Case-insensitive substring search over title, location, and category
    /// (not descriptions). An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<&Event> {
        self.store
            .events()
            .filter(|event| {
                engine::matches_query(event, self.store.additional_info(event.id), query)
            })
            .collect()
    }

    /// One-line summary of the most loaded weekday, by stored start dates.
    pub fn statistics(&self) -> String {
        match engine::busiest_day(self.store.events()) {
            Some((day, count)) => {
                format!("Busiest Day: {} ({} events)", engine::day_name(day), count)
            }
            None => "Not enough data for statistics.".to_string(),
        }
    }

    /// Reminder text for the given day's events, recurrence expanded.
    pub fn reminders_for(&self, date: NaiveDate) -> String {
        let todays = self.events_on(date);
        if todays.is_empty() {
            return "No events for today.".to_string();
        }
        let mut out = format!("You have {} event(s) today:\n", todays.len());
        for event in &todays {
            out.push_str(&format!(
                "- {} at {}\n",
                event.title,
                event.start.format("%H:%M")
            ));
        }
        out
    }

    /// `reminders_for` today, by the local clock.
    pub fn upcoming_reminders(&self) -> String {
        self.reminders_for(Local::now().date_naive())
    }

    // --- Backup / restore ---

    /// Writes the whole store to a single portable file.
    pub fn backup(&self, path: &Path) -> Result<()> {
        self.store.backup(path)?;
        info!("backed up {} events to {}", self.store.len(), path.display());
        Ok(())
    }

    /// Replaces the live tables and in-memory state with the backup content.
    /// An unreadable backup leaves both untouched; damaged rows inside a
    /// readable backup are skipped and reported, like any other load.
    pub fn restore(&mut self, path: &Path) -> Result<LoadReport> {
        let (store, report) = EventStore::restore(&self.paths, path)?;
        self.store = store;
        self.last_load = report.clone();
        info!(
            "restored {} events from {}",
            self.store.len(),
            path.display()
        );
        Ok(report)
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.paths) {
            error!(
                "could not persist store to {}: {e:#}",
                self.paths.dir().display()
            );
        }
    }
}

// Turns a draft into storable records. Free text is trimmed and stripped of
// delimiter/line-break characters, and timestamps are floored to the minute,
// so the in-memory event is exactly what a save-then-load would yield.
fn materialize(
    id: EventId,
    draft: &EventDraft,
) -> (Event, Option<Recurrence>, Option<AdditionalInfo>) {
    let event = Event {
        id,
        title: clean(&draft.title),
        description: clean(&draft.description),
        start: codec::minute_floor(draft.start),
        end: codec::minute_floor(draft.end),
    };
    let recurrence = (!draft.interval.is_none()).then(|| Recurrence {
        event_id: id,
        interval: draft.interval,
        times: draft.times,
        until: draft.until,
    });
    let info = (draft.location.is_some() || draft.category.is_some()).then(|| AdditionalInfo {
        event_id: id,
        location: clean(draft.location.as_deref().unwrap_or_default()),
        category: clean(draft.category.as_deref().unwrap_or_default()),
    });
    (event, recurrence, info)
}

fn clean(field: &str) -> String {
    codec::sanitize(field).trim().to_string()
}
