// File: ./src/engine.rs
// Pure scheduling rules: interval conflicts, recurrence membership, weekday
// statistics, and text search. No I/O here; the manager feeds store data in.
use crate::model::{AdditionalInfo, Event, Recurrence, RecurrenceInterval};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};

/// Monday-first scan order for weekday statistics.
const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Returns the first stored event whose interval overlaps `[start, end)`.
/// Intervals are half-open: back-to-back events sharing an endpoint do not
/// conflict. Only the stored start/end rows are consulted; expanded
/// recurrence occurrences never block a new booking.
pub fn find_conflict<'a, I>(
    start: NaiveDateTime,
    end: NaiveDateTime,
    events: I,
) -> Option<&'a Event>
where
    I: IntoIterator<Item = &'a Event>,
{
    events
        .into_iter()
        .find(|event| start < event.end && end > event.start)
}

/// `find_conflict` as a plain availability check.
pub fn has_conflict<'a, I>(start: NaiveDateTime, end: NaiveDateTime, events: I) -> bool
where
    I: IntoIterator<Item = &'a Event>,
{
    find_conflict(start, end, events).is_some()
}

/// Whether `event` occurs on `target`, expanding its recurrence on the fly.
///
/// The stored start date always matches, recurrence or not. After that the
/// rule needs an interval, a target on or after the start, and (for weekly) a
/// day offset divisible by 7. An end date bounds the series inclusively and
/// takes precedence over a repeat count; a repeat count of `n` admits
/// occurrence indices `0..=n` (the original plus `n` repeats); with neither,
/// the series is unbounded.
pub fn occurs_on(event: &Event, recurrence: Option<&Recurrence>, target: NaiveDate) -> bool {
    let first = event.start.date();
    if first == target {
        return true;
    }
    let Some(rec) = recurrence else {
        return false;
    };
    if rec.interval.is_none() || target < first {
        return false;
    }

    let offset = (target - first).num_days();
    if rec.interval == RecurrenceInterval::Weekly && offset % 7 != 0 {
        return false;
    }

    if let Some(until) = rec.until {
        return target <= until;
    }
    if rec.times > 0 {
        let index = match rec.interval {
            RecurrenceInterval::Weekly => offset / 7,
            _ => offset,
        };
        return index <= i64::from(rec.times);
    }
    true
}

/// The weekday (by event start) with the most events, Monday winning ties,
/// then later days only on a strictly greater count. None with no events.
pub fn busiest_day<'a, I>(events: I) -> Option<(Weekday, usize)>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut counts = [0usize; 7];
    for event in events {
        counts[event.start.weekday().num_days_from_monday() as usize] += 1;
    }
    if counts.iter().all(|&c| c == 0) {
        return None;
    }

    let mut best = (WEEK[0], counts[0]);
    for (i, &day) in WEEK.iter().enumerate().skip(1) {
        if counts[i] > best.1 {
            best = (day, counts[i]);
        }
    }
    Some(best)
}

/// Full English weekday name (chrono's Display is the 3-letter form).
pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Case-insensitive substring match over the title and, when an extension
/// record exists, location and category. Descriptions are not searched.
pub fn matches_query(event: &Event, info: Option<&AdditionalInfo>, query: &str) -> bool {
    let query = query.to_lowercase();
    if event.title.to_lowercase().contains(&query) {
        return true;
    }
    info.is_some_and(|info| {
        info.location.to_lowercase().contains(&query)
            || info.category.to_lowercase().contains(&query)
    })
}
