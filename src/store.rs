// File: ./src/store.rs
// The canonical in-memory aggregate of the three flat tables, plus load,
// full-rewrite save, and the unified backup/restore protocol.
use crate::model::{AdditionalInfo, Event, EventId, Recurrence};
use crate::storage::{self, StorePaths};
use anyhow::{Context, Result};
use log::{error, warn};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

// Header lines of the three tables, fixed by the on-disk format. The first
// line of a table is always skipped on load, whatever it contains.
pub const EVENT_HEADER: &str = "eventId, title, description, startDateTime, endDateTime";
pub const RECUR_HEADER: &str = "eventId, recurrentInterval, recurrentTimes, recurrentEndDate";
pub const ADD_HEADER: &str = "eventId, location, category";

// Section sentinels of the unified backup file (no per-section headers).
const EVENTS_SENTINEL: &str = "###EVENTS###";
const RECURRENCE_SENTINEL: &str = "###RECURRENCE###";
const ADDITIONAL_SENTINEL: &str = "###ADDITIONAL###";

/// Which table (or file) a load diagnostic refers to. `Backup` covers lines
/// of a unified backup file that belong to no section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Events,
    Recurrences,
    Additional,
    Backup,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::Recurrences => "recurrences",
            Self::Additional => "additional",
            Self::Backup => "backup",
        }
    }
}

/// Why a row was dropped during a load or a backup parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The row did not decode into the expected typed fields.
    Unparsable,
    /// A row with this id was already loaded; the first row wins.
    DuplicateId,
    /// Extension row whose event id references no loaded event.
    Orphaned,
    /// Backup-file line outside any recognized `###...###` section.
    OutsideSection,
}

/// One dropped row. `line` is 1-based within the file it came from.
#[derive(Debug, Clone)]
pub struct SkippedLine {
    pub table: Table,
    pub line: usize,
    pub reason: SkipReason,
    pub raw: String,
}

/// Outcome of a load or a backup parse: how much was read, what was dropped,
/// and which files failed outright. Skipped rows are tolerated (a partially
/// corrupted store must not prevent loading the rest) but never invisible.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub events: usize,
    pub recurrences: usize,
    pub additional: usize,
    pub skipped: Vec<SkippedLine>,
    pub errors: Vec<String>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.errors.is_empty()
    }

    fn skip(&mut self, table: Table, line: usize, reason: SkipReason, raw: &str) {
        warn!(
            "skipping {} row at line {} ({:?}): {}",
            table.as_str(),
            line,
            reason,
            raw
        );
        self.skipped.push(SkippedLine {
            table,
            line,
            reason,
            raw: raw.to_string(),
        });
    }
}

// Decoded row still carrying its location in the source file, so the late
// duplicate/orphan checks can report it.
struct Row<T> {
    line: usize,
    raw: String,
    record: T,
}

/// Owns the three collections. All mutation goes through the methods below;
/// extension records can only ever be attached to a live event id, and
/// removal always cascades.
#[derive(Debug, Default)]
pub struct EventStore {
    events: BTreeMap<EventId, Event>,
    recurrences: BTreeMap<EventId, Recurrence>,
    additional: BTreeMap<EventId, AdditionalInfo>,
}

impl EventStore {
    // --- Read-only views (what the scheduling engine sees) ---

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    pub fn event(&self, id: EventId) -> Option<&Event> {
        self.events.get(&id)
    }

    pub fn recurrence(&self, id: EventId) -> Option<&Recurrence> {
        self.recurrences.get(&id)
    }

    pub fn additional_info(&self, id: EventId) -> Option<&AdditionalInfo> {
        self.additional.get(&id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Next id to assign: `max(existing) + 1`, `1` when empty. Ids are never
    /// renumbered, so a deleted non-maximal id stays retired.
    pub fn next_id(&self) -> EventId {
        self.events.keys().next_back().map_or(1, |max| max + 1)
    }

    // --- Mutation (callers persist separately) ---

    /// Adds a new event and its optional extensions. The caller supplies a
    /// fresh id from `next_id`.
    pub fn insert(
        &mut self,
        event: Event,
        recurrence: Option<Recurrence>,
        info: Option<AdditionalInfo>,
    ) {
        let id = event.id;
        self.events.insert(id, event);
        if let Some(rec) = recurrence {
            self.recurrences.insert(id, rec);
        }
        if let Some(info) = info {
            self.additional.insert(id, info);
        }
    }

    /// Replaces the event with `id` and unconditionally drops + recreates its
    /// extensions. Returns false (touching nothing) when the id is absent, so
    /// a stale update can never plant orphaned extension records.
    pub fn replace(
        &mut self,
        id: EventId,
        event: Event,
        recurrence: Option<Recurrence>,
        info: Option<AdditionalInfo>,
    ) -> bool {
        if !self.events.contains_key(&id) {
            return false;
        }
        self.events.insert(id, event);
        self.recurrences.remove(&id);
        if let Some(rec) = recurrence {
            self.recurrences.insert(id, rec);
        }
        self.additional.remove(&id);
        if let Some(info) = info {
            self.additional.insert(id, info);
        }
        true
    }

    /// Removes the event and cascades to its extension records.
    pub fn remove(&mut self, id: EventId) -> bool {
        let removed = self.events.remove(&id).is_some();
        self.recurrences.remove(&id);
        self.additional.remove(&id);
        removed
    }

    // --- Load ---

    /// Reads the three tables. Missing files yield empty tables (a first run
    /// is not an error); read failures are reported and yield empty tables;
    /// undecodable, duplicate, and orphaned rows are dropped into the report.
    pub fn load(paths: &StorePaths) -> (Self, LoadReport) {
        storage::with_lock(paths, || Ok(Self::load_unlocked(paths))).unwrap_or_else(|e| {
            error!("store lock unavailable, starting empty: {e:#}");
            let mut report = LoadReport::default();
            report.errors.push(format!("lock: {e:#}"));
            (Self::default(), report)
        })
    }

    fn load_unlocked(paths: &StorePaths) -> (Self, LoadReport) {
        let mut report = LoadReport::default();
        let events = read_table(&paths.events(), Table::Events, Event::from_csv, &mut report);
        let recurrences = read_table(
            &paths.recurrences(),
            Table::Recurrences,
            Recurrence::from_csv,
            &mut report,
        );
        let additional = read_table(
            &paths.additional(),
            Table::Additional,
            AdditionalInfo::from_csv,
            &mut report,
        );
        let store = Self::from_rows(events, recurrences, additional, &mut report);
        (store, report)
    }

    // Builds the aggregate from decoded rows, enforcing first-id-wins and
    // referential integrity. Shared by table load and backup parse.
    fn from_rows(
        events: Vec<Row<Event>>,
        recurrences: Vec<Row<Recurrence>>,
        additional: Vec<Row<AdditionalInfo>>,
        report: &mut LoadReport,
    ) -> Self {
        let mut store = Self::default();
        for row in events {
            let id = row.record.id;
            if store.events.contains_key(&id) {
                report.skip(Table::Events, row.line, SkipReason::DuplicateId, &row.raw);
                continue;
            }
            store.events.insert(id, row.record);
            report.events += 1;
        }
        for row in recurrences {
            let id = row.record.event_id;
            if !store.events.contains_key(&id) {
                report.skip(Table::Recurrences, row.line, SkipReason::Orphaned, &row.raw);
                continue;
            }
            if store.recurrences.contains_key(&id) {
                report.skip(Table::Recurrences, row.line, SkipReason::DuplicateId, &row.raw);
                continue;
            }
            store.recurrences.insert(id, row.record);
            report.recurrences += 1;
        }
        for row in additional {
            let id = row.record.event_id;
            if !store.events.contains_key(&id) {
                report.skip(Table::Additional, row.line, SkipReason::Orphaned, &row.raw);
                continue;
            }
            if store.additional.contains_key(&id) {
                report.skip(Table::Additional, row.line, SkipReason::DuplicateId, &row.raw);
                continue;
            }
            store.additional.insert(id, row.record);
            report.additional += 1;
        }
        store
    }

    // --- Save (full rewrite, every mutation) ---

    pub fn save(&self, paths: &StorePaths) -> Result<()> {
        storage::with_lock(paths, || self.save_unlocked(paths))
    }

    fn save_unlocked(&self, paths: &StorePaths) -> Result<()> {
        storage::atomic_write(
            paths.events(),
            render_table(EVENT_HEADER, self.events.values().map(Event::to_csv)),
        )
        .context("writing event table")?;
        storage::atomic_write(
            paths.recurrences(),
            render_table(RECUR_HEADER, self.recurrences.values().map(Recurrence::to_csv)),
        )
        .context("writing recurrence table")?;
        storage::atomic_write(
            paths.additional(),
            render_table(ADD_HEADER, self.additional.values().map(AdditionalInfo::to_csv)),
        )
        .context("writing additional-info table")?;
        Ok(())
    }

    // --- Unified backup / restore ---

    /// Writes the whole store into one sentinel-sectioned file.
    pub fn backup(&self, path: &Path) -> Result<()> {
        let mut out = String::new();
        out.push_str(EVENTS_SENTINEL);
        out.push('\n');
        for event in self.events.values() {
            out.push_str(&event.to_csv());
            out.push('\n');
        }
        out.push_str(RECURRENCE_SENTINEL);
        out.push('\n');
        for rec in self.recurrences.values() {
            out.push_str(&rec.to_csv());
            out.push('\n');
        }
        out.push_str(ADDITIONAL_SENTINEL);
        out.push('\n');
        for info in self.additional.values() {
            out.push_str(&info.to_csv());
            out.push('\n');
        }
        storage::atomic_write(path, out)
            .with_context(|| format!("writing backup to {}", path.display()))
    }

    /// Parses a unified backup file into a fresh store. Fails only when the
    /// file itself cannot be read; row-level damage lands in the report.
    pub fn read_backup(path: &Path) -> Result<(Self, LoadReport)> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading backup {}", path.display()))?;

        let mut report = LoadReport::default();
        let mut events = Vec::new();
        let mut recurrences = Vec::new();
        let mut additional = Vec::new();
        // Any line starting with ### switches the section; an unknown
        // sentinel routes following rows nowhere.
        let mut section: Option<Table> = None;

        for (idx, line) in content.lines().enumerate() {
            let number = idx + 1;
            if line.starts_with("###") {
                section = match line {
                    EVENTS_SENTINEL => Some(Table::Events),
                    RECURRENCE_SENTINEL => Some(Table::Recurrences),
                    ADDITIONAL_SENTINEL => Some(Table::Additional),
                    _ => None,
                };
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }
            match section {
                Some(Table::Events) => {
                    push_row(line, number, Event::from_csv, &mut events).unwrap_or_else(|| {
                        report.skip(Table::Events, number, SkipReason::Unparsable, line)
                    });
                }
                Some(Table::Recurrences) => {
                    push_row(line, number, Recurrence::from_csv, &mut recurrences).unwrap_or_else(
                        || report.skip(Table::Recurrences, number, SkipReason::Unparsable, line),
                    );
                }
                Some(Table::Additional) => {
                    push_row(line, number, AdditionalInfo::from_csv, &mut additional)
                        .unwrap_or_else(|| {
                            report.skip(Table::Additional, number, SkipReason::Unparsable, line)
                        });
                }
                Some(Table::Backup) | None => {
                    report.skip(Table::Backup, number, SkipReason::OutsideSection, line)
                }
            }
        }

        let store = Self::from_rows(events, recurrences, additional, &mut report);
        Ok((store, report))
    }

    /// Destructive restore: overwrite the three live tables with the backup
    /// content, then reload from them. An unreadable backup fails before
    /// anything is touched. The table swap runs under the store lock; each
    /// table write is atomic, so a mid-restore failure can mix generations
    /// across tables but never tear one.
    pub fn restore(paths: &StorePaths, backup: &Path) -> Result<(Self, LoadReport)> {
        let (restored, report) = Self::read_backup(backup)?;
        let (reloaded, _) = storage::with_lock(paths, || {
            restored.save_unlocked(paths)?;
            Ok(Self::load_unlocked(paths))
        })?;
        Ok((reloaded, report))
    }
}

fn render_table<I>(header: &str, rows: I) -> String
where
    I: Iterator<Item = String>,
{
    let mut out = String::from(header);
    out.push('\n');
    for row in rows {
        out.push_str(&row);
        out.push('\n');
    }
    out
}

fn push_row<T>(
    line: &str,
    number: usize,
    decode: fn(&str) -> Option<T>,
    rows: &mut Vec<Row<T>>,
) -> Option<()> {
    let record = decode(line)?;
    rows.push(Row {
        line: number,
        raw: line.to_string(),
        record,
    });
    Some(())
}

// Reads one table file: header line skipped unconditionally, each remaining
// row decoded or dropped into the report.
fn read_table<T>(
    path: &Path,
    table: Table,
    decode: fn(&str) -> Option<T>,
    report: &mut LoadReport,
) -> Vec<Row<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            error!("could not read {} table {}: {e}", table.as_str(), path.display());
            report.errors.push(format!("{}: {e}", path.display()));
            return Vec::new();
        }
    };

    let mut rows = Vec::new();
    for (idx, line) in content.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let number = idx + 1;
        if push_row(line, number, decode, &mut rows).is_none() {
            report.skip(table, number, SkipReason::Unparsable, line);
        }
    }
    rows
}
