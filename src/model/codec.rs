// File: ./src/model/codec.rs
// Handles the delimited-line (CSV) serialization/deserialization
use crate::model::item::{AdditionalInfo, Event, Recurrence, RecurrenceInterval};
use chrono::{NaiveDate, NaiveDateTime, Timelike};

/// Field separator of the three flat tables and of the unified backup file.
pub const DELIMITER: char = ',';

/// Encoded timestamps are local ISO-8601 at minute precision.
const DATETIME_FMT: &str = "%Y-%m-%dT%H:%M";
/// Accepted on decode as well: rows written by hand or by other tools often
/// carry a seconds component. The component is floored away, not kept.
const DATETIME_FMT_SECONDS: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_FMT: &str = "%Y-%m-%d";

/// Replaces characters that would corrupt the line structure (the field
/// delimiter and line breaks) with a plain space. One-way: the original
/// characters are not recoverable.
pub fn sanitize(field: &str) -> String {
    field.replace([DELIMITER, '\n', '\r'], " ")
}

/// Floors a timestamp to the minute. The tables keep no seconds, so every
/// boundary that lets timestamps in runs them through this; otherwise a
/// save-then-load would shift event bounds.
pub fn minute_floor(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_second(0)
        .and_then(|dt| dt.with_nanosecond(0))
        .unwrap_or(dt)
}

fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FMT).to_string()
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FMT_SECONDS)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, DATETIME_FMT))
        .ok()
        .map(minute_floor)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FMT).ok()
}

/// Splits a table row into trimmed fields. Extra trailing fields are kept
/// here and ignored by the callers; too few fields makes the row invalid.
fn split_fields(line: &str, min: usize) -> Option<Vec<&str>> {
    let parts: Vec<&str> = line.split(DELIMITER).map(str::trim).collect();
    if parts.len() < min { None } else { Some(parts) }
}

impl Event {
    /// `eventId,title,description,startDateTime,endDateTime`
    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.id,
            sanitize(&self.title),
            sanitize(&self.description),
            format_datetime(self.start),
            format_datetime(self.end)
        )
    }

    /// Tolerant decode: any row that does not yield the five typed fields is
    /// absent, never an error. Callers skip (and may count) such rows.
    pub fn from_csv(line: &str) -> Option<Self> {
        let parts = split_fields(line, 5)?;
        Some(Self {
            id: parts[0].parse().ok()?,
            title: parts[1].to_string(),
            description: parts[2].to_string(),
            start: parse_datetime(parts[3])?,
            end: parse_datetime(parts[4])?,
        })
    }
}

impl Recurrence {
    /// `eventId,recurrentInterval,recurrentTimes,recurrentEndDate`
    ///
    /// An absent end date is serialized as the literal token `0`.
    pub fn to_csv(&self) -> String {
        let until = match self.until {
            Some(date) => date.format(DATE_FMT).to_string(),
            None => "0".to_string(),
        };
        format!("{},{},{},{}", self.event_id, self.interval.as_tag(), self.times, until)
    }

    pub fn from_csv(line: &str) -> Option<Self> {
        let parts = split_fields(line, 4)?;
        let until = if parts[3] == "0" {
            None
        } else {
            Some(parse_date(parts[3])?)
        };
        Some(Self {
            event_id: parts[0].parse().ok()?,
            // Unknown tags normalize to None: the record is kept but never
            // expands beyond its root date.
            interval: RecurrenceInterval::parse(parts[1]),
            times: parts[2].parse().ok()?,
            until,
        })
    }
}

impl AdditionalInfo {
    /// `eventId,location,category`
    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{}",
            self.event_id,
            sanitize(&self.location),
            sanitize(&self.category)
        )
    }

    pub fn from_csv(line: &str) -> Option<Self> {
        let parts = split_fields(line, 3)?;
        Some(Self {
            event_id: parts[0].parse().ok()?,
            location: parts[1].to_string(),
            category: parts[2].to_string(),
        })
    }
}
