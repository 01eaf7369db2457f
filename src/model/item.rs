// File: ./src/model/item.rs
// The three record kinds stored in the flat tables
use chrono::{NaiveDate, NaiveDateTime};

/// Store-assigned event identity: `max(existing ids) + 1`, starting at 1.
pub type EventId = u32;

/// A scheduled event. This is the aggregate root: recurrence and
/// location/category live in separate 1:1 extension records keyed by `id`.
///
/// Timestamps are timezone-less local wall-clock values at minute precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Closed recurrence vocabulary. External shorthand (the legacy `"1d"`/`"1w"`
/// create-path literals, `"Daily"`/`"Weekly"` in any case, `"none"`) is
/// normalized into this variant once, at the boundary; raw interval text
/// never reaches the scheduling logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecurrenceInterval {
    /// No repetition. Also the landing spot for unrecognized tags, which
    /// must never match beyond the root date.
    #[default]
    None,
    Daily,
    Weekly,
}

impl RecurrenceInterval {
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "daily" | "1d" => Self::Daily,
            "weekly" | "1w" => Self::Weekly,
            _ => Self::None,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
        }
    }

    pub fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

/// Recurrence extension record. `times == 0` means unbounded unless `until`
/// is set; when both are set, `until` wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recurrence {
    pub event_id: EventId,
    pub interval: RecurrenceInterval,
    pub times: u32,
    pub until: Option<NaiveDate>,
}

/// Location/category extension record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalInfo {
    pub event_id: EventId,
    pub location: String,
    pub category: String,
}
