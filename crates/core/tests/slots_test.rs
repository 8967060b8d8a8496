use bayan_core::{
    slots::{WorkingHours, generate_slots, working_slots_for_user},
    timezone::OffsetRule,
};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use pretty_assertions::assert_eq;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

#[test]
fn test_working_hours_windows() {
    let standard = WorkingHours::standard().provider_times();
    assert_eq!(standard.len(), 24);
    assert_eq!(standard.first(), Some(&time(8, 0)));
    assert_eq!(standard.last(), Some(&time(19, 30)));

    let full_day = WorkingHours::full_day().provider_times();
    assert_eq!(full_day.len(), 48);
    assert_eq!(full_day.last(), Some(&time(23, 30)));

    assert_eq!(WorkingHours::default(), WorkingHours::standard());
}

#[test]
fn test_generate_slots_in_utc() {
    let slots = generate_slots(
        date(2025, 9, 18),
        &WorkingHours::standard(),
        chrono_tz::UTC,
        OffsetRule::Heuristic,
    );

    assert_eq!(slots.len(), 24);
    assert_eq!(slots[0].starts_at_utc, Utc.with_ymd_and_hms(2025, 9, 18, 5, 0, 0).unwrap());
    assert_eq!(slots[0].provider_time, time(8, 0));
    assert_eq!(slots[0].local_time(), time(5, 0));
    assert_eq!(slots[23].starts_at_utc, Utc.with_ymd_and_hms(2025, 9, 18, 16, 30, 0).unwrap());
    assert!(slots.windows(2).all(|w| w[0].starts_at_utc < w[1].starts_at_utc));
}

#[test]
fn test_slots_spill_into_next_viewer_day() {
    let slots = generate_slots(
        date(2025, 9, 18),
        &WorkingHours::standard(),
        chrono_tz::Asia::Tokyo,
        OffsetRule::Heuristic,
    );

    let first = slots.first().unwrap();
    let last = slots.last().unwrap();
    assert_eq!(first.local_date(), date(2025, 9, 18));
    assert_eq!(first.local_time(), time(14, 0));
    assert_eq!(last.local_date(), date(2025, 9, 19));
    assert_eq!(last.local_time(), time(1, 30));
}

#[test]
fn test_slots_spill_into_previous_viewer_day() {
    let slots = generate_slots(
        date(2025, 9, 18),
        &WorkingHours::standard(),
        chrono_tz::America::Los_Angeles,
        OffsetRule::Heuristic,
    );

    assert_eq!(slots[0].local_date(), date(2025, 9, 17));
    assert_eq!(slots[0].local_time(), time(22, 0));
}

#[test]
fn test_to_session_keeps_utc_instant() {
    let slots = generate_slots(
        date(2025, 1, 8),
        &WorkingHours::standard(),
        chrono_tz::Europe::London,
        OffsetRule::Heuristic,
    );

    let session = slots[0].to_session();
    assert_eq!(session.date, date(2025, 1, 8));
    assert_eq!(session.time, time(6, 0));
    assert_eq!(session.starts_at_utc, Some(slots[0].starts_at_utc));
    assert_eq!(session.notes, None);
}

#[test]
fn test_working_slots_for_user() {
    let triples = working_slots_for_user(date(2025, 9, 18), chrono_tz::UTC, OffsetRule::Heuristic);

    assert_eq!(triples.len(), 48);
    assert_eq!(triples[0].cairo_time, "00:00");
    assert_eq!(triples[0].user_time, "21:00");
    assert_eq!(triples[0].utc_time, Utc.with_ymd_and_hms(2025, 9, 17, 21, 0, 0).unwrap());
    assert_eq!(triples[47].cairo_time, "23:30");
}

#[test]
fn test_slot_triple_serializes_camel_case() {
    let triples = working_slots_for_user(date(2025, 1, 8), chrono_tz::UTC, OffsetRule::Heuristic);
    let value = serde_json::to_value(&triples[16]).unwrap();

    assert_eq!(value["cairoTime"], "08:00");
    assert_eq!(value["userTime"], "06:00");
    assert_eq!(value["utcTime"], "2025-01-08T06:00:00Z");
}
