use chrono::{NaiveDate, NaiveDateTime};
use flatcal::manager::{CalendarManager, EventDraft, ScheduleError};
use flatcal::model::RecurrenceInterval;
use flatcal::storage::StorePaths;
use tempfile::TempDir;

fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn manager_in(dir: &TempDir) -> CalendarManager {
    CalendarManager::with_paths(StorePaths::at(dir.path().to_path_buf()))
}

#[test]
fn test_create_assigns_ids_and_lists_by_date() {
    let dir = TempDir::new().unwrap();
    let mut mgr = manager_in(&dir);

    // 1. Two non-overlapping events on the same day
    let a = mgr
        .create_event(&EventDraft::new(
            "Standup",
            dt(2024, 5, 6, 9, 0),
            dt(2024, 5, 6, 9, 30),
        ))
        .unwrap();
    let b = mgr
        .create_event(&EventDraft::new(
            "Review",
            dt(2024, 5, 6, 10, 0),
            dt(2024, 5, 6, 11, 0),
        ))
        .unwrap();
    assert_eq!(a, 1);
    assert_eq!(b, 2);

    // 2. Both show up for that date, in id order
    let todays = mgr.events_on(date(2024, 5, 6));
    assert_eq!(todays.len(), 2);
    assert_eq!(todays[0].title, "Standup");
    assert_eq!(todays[1].title, "Review");
    assert!(mgr.events_on(date(2024, 5, 7)).is_empty());
}

#[test]
fn test_conflicting_slot_is_rejected_without_mutation() {
    let dir = TempDir::new().unwrap();
    let mut mgr = manager_in(&dir);

    mgr.create_event(&EventDraft::new(
        "Existing",
        dt(2024, 5, 6, 10, 0),
        dt(2024, 5, 6, 11, 0),
    ))
    .unwrap();

    // 1. Overlapping draft is rejected, carrying the blocking event
    let err = mgr
        .create_event(&EventDraft::new(
            "Intruder",
            dt(2024, 5, 6, 10, 30),
            dt(2024, 5, 6, 11, 30),
        ))
        .unwrap_err();
    assert_eq!(
        err,
        ScheduleError::Conflict {
            title: "Existing".to_string(),
            start: dt(2024, 5, 6, 10, 0),
            end: dt(2024, 5, 6, 11, 0),
        }
    );

    // 2. Nothing was stored, and the failed attempt did not burn an id
    assert_eq!(mgr.events().count(), 1);
    let next = mgr
        .create_event(&EventDraft::new(
            "Later",
            dt(2024, 5, 6, 12, 0),
            dt(2024, 5, 6, 13, 0),
        ))
        .unwrap();
    assert_eq!(next, 2);
}

#[test]
fn test_back_to_back_slots_do_not_conflict() {
    let dir = TempDir::new().unwrap();
    let mut mgr = manager_in(&dir);

    mgr.create_event(&EventDraft::new(
        "First",
        dt(2024, 5, 6, 10, 0),
        dt(2024, 5, 6, 11, 0),
    ))
    .unwrap();
    // Sharing an endpoint is fine in both directions
    mgr.create_event(&EventDraft::new(
        "Right after",
        dt(2024, 5, 6, 11, 0),
        dt(2024, 5, 6, 12, 0),
    ))
    .unwrap();
    mgr.create_event(&EventDraft::new(
        "Right before",
        dt(2024, 5, 6, 9, 0),
        dt(2024, 5, 6, 10, 0),
    ))
    .unwrap();
    assert_eq!(mgr.events().count(), 3);
}

#[test]
fn test_event_must_end_after_it_starts() {
    let dir = TempDir::new().unwrap();
    let mut mgr = manager_in(&dir);

    let instant = dt(2024, 5, 6, 10, 0);
    let zero = EventDraft::new("Zero length", instant, instant);
    assert_eq!(
        mgr.create_event(&zero).unwrap_err(),
        ScheduleError::InvalidInterval {
            start: instant,
            end: instant,
        }
    );

    let backwards = EventDraft::new("Backwards", dt(2024, 5, 6, 11, 0), dt(2024, 5, 6, 10, 0));
    assert!(matches!(
        mgr.create_event(&backwards),
        Err(ScheduleError::InvalidInterval { .. })
    ));
    assert_eq!(mgr.events().count(), 0);
}

#[test]
fn test_sub_minute_timestamps_are_floored_at_intake() {
    let dir = TempDir::new().unwrap();
    let mut mgr = manager_in(&dir);

    // 1. A draft carrying seconds lands on the minute grid
    let id = mgr
        .create_event(&EventDraft::new(
            "Standup",
            date(2024, 5, 6).and_hms_opt(10, 0, 30).unwrap(),
            date(2024, 5, 6).and_hms_opt(11, 0, 30).unwrap(),
        ))
        .unwrap();
    let stored = mgr.event(id).unwrap();
    assert_eq!(stored.start, dt(2024, 5, 6, 10, 0));
    assert_eq!(stored.end, dt(2024, 5, 6, 11, 0));

    // 2. A reopened store sees the same bounds, so nothing shifts on reload
    let mut mgr = manager_in(&dir);
    assert_eq!(mgr.event(id).unwrap().start, dt(2024, 5, 6, 10, 0));
    assert_eq!(mgr.event(id).unwrap().end, dt(2024, 5, 6, 11, 0));

    // 3. A sub-minute sliver floors to an empty interval and is rejected,
    //    so it can never overlap the slot after a reload
    let sliver = EventDraft::new(
        "Sliver",
        dt(2024, 5, 6, 10, 0),
        date(2024, 5, 6).and_hms_opt(10, 0, 30).unwrap(),
    );
    assert_eq!(
        mgr.create_event(&sliver).unwrap_err(),
        ScheduleError::InvalidInterval {
            start: dt(2024, 5, 6, 10, 0),
            end: dt(2024, 5, 6, 10, 0),
        }
    );

    // 4. The conflict scan uses the floored bounds: a slot whose raw end
    //    spills seconds past 10:00 still books back-to-back
    let warmup = EventDraft::new(
        "Warmup",
        dt(2024, 5, 6, 9, 30),
        date(2024, 5, 6).and_hms_opt(10, 0, 30).unwrap(),
    );
    assert!(mgr.create_event(&warmup).is_ok());

    // 5. Updates floor the same way
    let tweak = EventDraft::new(
        "Standup",
        date(2024, 5, 6).and_hms_opt(10, 30, 15).unwrap(),
        dt(2024, 5, 6, 11, 30),
    );
    mgr.update_event(id, &tweak).unwrap();
    assert_eq!(mgr.event(id).unwrap().start, dt(2024, 5, 6, 10, 30));
    assert_eq!(mgr.event(id).unwrap().end, dt(2024, 5, 6, 11, 30));
}

#[test]
fn test_weekly_recurrence_with_repeat_count() {
    let dir = TempDir::new().unwrap();
    let mut mgr = manager_in(&dir);

    // times = 1: the original Wednesday plus exactly one repeat
    let mut draft = EventDraft::new("Yoga", dt(2024, 5, 1, 18, 0), dt(2024, 5, 1, 19, 0));
    draft.interval = RecurrenceInterval::Weekly;
    draft.times = 1;
    mgr.create_event(&draft).unwrap();

    assert_eq!(mgr.events_on(date(2024, 5, 1)).len(), 1);
    assert_eq!(mgr.events_on(date(2024, 5, 8)).len(), 1);
    assert!(mgr.events_on(date(2024, 5, 15)).is_empty());
    assert!(mgr.events_on(date(2024, 5, 4)).is_empty());
}

#[test]
fn test_recurrence_end_date_beats_repeat_count() {
    let dir = TempDir::new().unwrap();
    let mut mgr = manager_in(&dir);

    let mut draft = EventDraft::new("Medication", dt(2024, 5, 1, 8, 0), dt(2024, 5, 1, 8, 15));
    draft.interval = RecurrenceInterval::Daily;
    draft.times = 30;
    draft.until = Some(date(2024, 5, 3));
    mgr.create_event(&draft).unwrap();

    assert_eq!(mgr.events_on(date(2024, 5, 3)).len(), 1);
    assert!(mgr.events_on(date(2024, 5, 4)).is_empty());
}

#[test]
fn test_unbounded_daily_recurrence() {
    let dir = TempDir::new().unwrap();
    let mut mgr = manager_in(&dir);

    let mut draft = EventDraft::new("Backup job", dt(2024, 5, 1, 3, 0), dt(2024, 5, 1, 3, 30));
    draft.interval = RecurrenceInterval::Daily;
    mgr.create_event(&draft).unwrap();

    assert_eq!(mgr.events_on(date(2025, 2, 17)).len(), 1);
    assert!(mgr.events_on(date(2024, 4, 30)).is_empty());
}

#[test]
fn test_occupied_dates_for_a_month() {
    let dir = TempDir::new().unwrap();
    let mut mgr = manager_in(&dir);

    let mut weekly = EventDraft::new("Club", dt(2024, 5, 10, 19, 0), dt(2024, 5, 10, 21, 0));
    weekly.interval = RecurrenceInterval::Weekly;
    mgr.create_event(&weekly).unwrap();
    mgr.create_event(&EventDraft::new(
        "Dentist",
        dt(2024, 5, 2, 9, 0),
        dt(2024, 5, 2, 10, 0),
    ))
    .unwrap();

    assert_eq!(
        mgr.occupied_dates(2024, 5),
        vec![
            date(2024, 5, 2),
            date(2024, 5, 10),
            date(2024, 5, 17),
            date(2024, 5, 24),
            date(2024, 5, 31),
        ]
    );
    // The weekly series runs on into June
    assert!(mgr.occupied_dates(2024, 6).contains(&date(2024, 6, 7)));
    assert!(mgr.occupied_dates(2024, 4).is_empty());
}

#[test]
fn test_update_rewrites_event_and_extensions() {
    let dir = TempDir::new().unwrap();
    let mut mgr = manager_in(&dir);

    // 1. Create with recurrence and additional info
    let mut draft = EventDraft::new("Gym", dt(2024, 5, 6, 7, 0), dt(2024, 5, 6, 8, 0));
    draft.interval = RecurrenceInterval::Daily;
    draft.location = Some("Downtown".to_string());
    draft.category = Some("Health".to_string());
    let id = mgr.create_event(&draft).unwrap();
    assert!(mgr.recurrence(id).is_some());
    assert!(mgr.additional_info(id).is_some());

    // 2. Update to a plain one-off event with no extras
    let update = EventDraft::new("Gym (rescheduled)", dt(2024, 5, 7, 7, 0), dt(2024, 5, 7, 8, 0));
    mgr.update_event(id, &update).unwrap();

    let event = mgr.event(id).unwrap();
    assert_eq!(event.title, "Gym (rescheduled)");
    assert_eq!(event.start, dt(2024, 5, 7, 7, 0));
    assert!(mgr.recurrence(id).is_none());
    assert!(mgr.additional_info(id).is_none());

    // 3. The old slot no longer blocks new bookings
    mgr.create_event(&EventDraft::new(
        "Free slot",
        dt(2024, 5, 6, 7, 0),
        dt(2024, 5, 6, 8, 0),
    ))
    .unwrap();
}

#[test]
fn test_update_of_unknown_id_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let mut mgr = manager_in(&dir);

    let mut draft = EventDraft::new("Ghost", dt(2024, 5, 6, 10, 0), dt(2024, 5, 6, 11, 0));
    draft.location = Some("Nowhere".to_string());
    mgr.update_event(42, &draft).unwrap();

    // No event, and no stray extension record either
    assert_eq!(mgr.events().count(), 0);
    assert!(mgr.additional_info(42).is_none());
}

#[test]
fn test_update_still_validates_the_interval() {
    let dir = TempDir::new().unwrap();
    let mut mgr = manager_in(&dir);

    let id = mgr
        .create_event(&EventDraft::new(
            "Meeting",
            dt(2024, 5, 6, 10, 0),
            dt(2024, 5, 6, 11, 0),
        ))
        .unwrap();
    let bad = EventDraft::new("Meeting", dt(2024, 5, 6, 11, 0), dt(2024, 5, 6, 10, 0));
    assert!(matches!(
        mgr.update_event(id, &bad),
        Err(ScheduleError::InvalidInterval { .. })
    ));
    assert_eq!(mgr.event(id).unwrap().start, dt(2024, 5, 6, 10, 0));
}

#[test]
fn test_delete_cascades_and_retires_the_id() {
    let dir = TempDir::new().unwrap();
    let mut mgr = manager_in(&dir);

    let mut draft = EventDraft::new("Doomed", dt(2024, 5, 6, 10, 0), dt(2024, 5, 6, 11, 0));
    draft.interval = RecurrenceInterval::Weekly;
    draft.category = Some("Temp".to_string());
    let first = mgr.create_event(&draft).unwrap();
    let second = mgr
        .create_event(&EventDraft::new(
            "Keeper",
            dt(2024, 5, 6, 12, 0),
            dt(2024, 5, 6, 13, 0),
        ))
        .unwrap();

    // 1. Delete removes the event and everything attached to it
    assert!(mgr.delete_event(first));
    assert!(mgr.event(first).is_none());
    assert!(mgr.recurrence(first).is_none());
    assert!(mgr.additional_info(first).is_none());
    assert!(mgr.event(second).is_some());

    // 2. Deleting again reports absence
    assert!(!mgr.delete_event(first));

    // 3. The freed low id is not handed out again
    let third = mgr
        .create_event(&EventDraft::new(
            "Next",
            dt(2024, 5, 6, 14, 0),
            dt(2024, 5, 6, 15, 0),
        ))
        .unwrap();
    assert_eq!(third, second + 1);
}

#[test]
fn test_search_matches_title_location_and_category() {
    let dir = TempDir::new().unwrap();
    let mut mgr = manager_in(&dir);

    let mut a = EventDraft::new("Team Standup", dt(2024, 5, 6, 9, 0), dt(2024, 5, 6, 9, 30));
    a.description = "daily sync with the backend team".to_string();
    a.location = Some("Room 4".to_string());
    a.category = Some("Work".to_string());
    mgr.create_event(&a).unwrap();

    let mut b = EventDraft::new("Dentist", dt(2024, 5, 7, 9, 0), dt(2024, 5, 7, 10, 0));
    b.category = Some("Health".to_string());
    mgr.create_event(&b).unwrap();

    assert_eq!(mgr.search("standup").len(), 1);
    assert_eq!(mgr.search("ROOM").len(), 1);
    assert_eq!(mgr.search("health").len(), 1);
    // Descriptions are not searched
    assert!(mgr.search("backend").is_empty());
    assert!(mgr.search("lunch").is_empty());
    // Blank query matches everything
    assert_eq!(mgr.search("").len(), 2);
}

#[test]
fn test_statistics_report_busiest_weekday() {
    let dir = TempDir::new().unwrap();
    let mut mgr = manager_in(&dir);

    assert_eq!(mgr.statistics(), "Not enough data for statistics.");

    // Two Wednesdays, one Monday
    mgr.create_event(&EventDraft::new(
        "A",
        dt(2024, 5, 8, 9, 0),
        dt(2024, 5, 8, 10, 0),
    ))
    .unwrap();
    mgr.create_event(&EventDraft::new(
        "B",
        dt(2024, 5, 15, 9, 0),
        dt(2024, 5, 15, 10, 0),
    ))
    .unwrap();
    mgr.create_event(&EventDraft::new(
        "C",
        dt(2024, 5, 6, 9, 0),
        dt(2024, 5, 6, 10, 0),
    ))
    .unwrap();

    assert_eq!(mgr.statistics(), "Busiest Day: Wednesday (2 events)");
}

#[test]
fn test_statistics_tie_goes_to_the_earlier_weekday() {
    let dir = TempDir::new().unwrap();
    let mut mgr = manager_in(&dir);

    // One Tuesday, one Friday
    mgr.create_event(&EventDraft::new(
        "A",
        dt(2024, 5, 7, 9, 0),
        dt(2024, 5, 7, 10, 0),
    ))
    .unwrap();
    mgr.create_event(&EventDraft::new(
        "B",
        dt(2024, 5, 10, 9, 0),
        dt(2024, 5, 10, 10, 0),
    ))
    .unwrap();

    assert_eq!(mgr.statistics(), "Busiest Day: Tuesday (1 events)");
}

#[test]
fn test_reminder_text_for_a_day() {
    let dir = TempDir::new().unwrap();
    let mut mgr = manager_in(&dir);

    assert_eq!(mgr.reminders_for(date(2024, 5, 6)), "No events for today.");

    mgr.create_event(&EventDraft::new(
        "Standup",
        dt(2024, 5, 6, 9, 0),
        dt(2024, 5, 6, 9, 30),
    ))
    .unwrap();
    let mut daily = EventDraft::new("Lunch walk", dt(2024, 5, 1, 12, 30), dt(2024, 5, 1, 13, 0));
    daily.interval = RecurrenceInterval::Daily;
    mgr.create_event(&daily).unwrap();

    assert_eq!(
        mgr.reminders_for(date(2024, 5, 6)),
        "You have 2 event(s) today:\n- Standup at 09:00\n- Lunch walk at 12:30\n"
    );
}

#[test]
fn test_free_text_is_trimmed_and_delimiters_neutralized() {
    let dir = TempDir::new().unwrap();
    let mut mgr = manager_in(&dir);

    let mut draft = EventDraft::new(
        "  Planning, part 1  ",
        dt(2024, 5, 6, 10, 0),
        dt(2024, 5, 6, 11, 0),
    );
    draft.description = "line one\nline two".to_string();
    let id = mgr.create_event(&draft).unwrap();

    let event = mgr.event(id).unwrap();
    assert_eq!(event.title, "Planning  part 1");
    assert_eq!(event.description, "line one line two");
}
