//! Timestamp extraction from card text.
//!
//! Two forms appear in the feed: a full `Jan 30, 2026 7:24 AM` stamp (which
//! keeps its own date) and a bare `7:24 AM` clock time (which resolves to
//! wall-clock on the target scrape date). All times are naive wall-clock in
//! the portal's timezone.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

const MONTHS: &str = "Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec";

static FULL_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b({MONTHS})\s+(\d{{1,2}}),?\s+(\d{{4}})\s+(\d{{1,2}}):(\d{{2}})\s*(AM|PM)"
    ))
    .expect("full timestamp pattern is valid")
});

static CLOCK_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2}):(\d{2})\s*(AM|PM)").expect("clock pattern is valid")
});

pub(crate) fn month_number(name: &str) -> u32 {
    match name.to_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        _ => 12,
    }
}

pub(crate) fn to_24h(hour: u32, meridiem: &str) -> u32 {
    let pm = meridiem.eq_ignore_ascii_case("pm");
    match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    }
}

/// Parse a full `Mon D, YYYY h:mm AM/PM` stamp anywhere in `text`
pub fn find_full_timestamp(text: &str) -> Option<NaiveDateTime> {
    let caps = FULL_TIMESTAMP.captures(text)?;
    let month = month_number(&caps[1]);
    let day: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    let hour: u32 = caps[4].parse().ok()?;
    let minute: u32 = caps[5].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(to_24h(hour, &caps[6]), minute, 0)
}

/// Parse a bare `h:mm AM/PM` clock time anywhere in `text`
pub fn find_clock_time(text: &str) -> Option<NaiveTime> {
    let caps = CLOCK_TIME.captures(text)?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    NaiveTime::from_hms_opt(to_24h(hour, &caps[3]), minute, 0)
}

/// Best-effort card timestamp: full stamp wins, then bare clock time on the
/// target date, then midnight of the target date.
pub fn card_timestamp(text: &str, target_date: NaiveDate) -> NaiveDateTime {
    if let Some(full) = find_full_timestamp(text) {
        return full;
    }
    if let Some(time) = find_clock_time(text) {
        return target_date.and_time(time);
    }
    target_date.and_hms_opt(0, 0, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 30).unwrap()
    }

    #[test]
    fn full_timestamp_keeps_its_own_date() {
        let ts = find_full_timestamp("Occurred at Jan 29, 2026 3:06 PM").unwrap();
        assert_eq!(
            ts,
            NaiveDate::from_ymd_opt(2026, 1, 29)
                .unwrap()
                .and_hms_opt(15, 6, 0)
                .unwrap()
        );
    }

    #[test]
    fn twelve_hour_edges() {
        assert_eq!(to_24h(12, "AM"), 0);
        assert_eq!(to_24h(12, "PM"), 12);
        assert_eq!(to_24h(1, "PM"), 13);
        assert_eq!(to_24h(7, "AM"), 7);
    }

    #[test]
    fn comma_is_optional_in_full_stamp() {
        assert!(find_full_timestamp("Jan 30 2026 7:24 AM").is_some());
        assert!(find_full_timestamp("Jan 30, 2026 7:24 AM").is_some());
    }

    #[test]
    fn bare_clock_resolves_on_target_date() {
        let ts = card_timestamp("something at 11:35 AM today", date());
        assert_eq!(ts, date().and_hms_opt(11, 35, 0).unwrap());
    }

    #[test]
    fn no_time_falls_back_to_midnight() {
        let ts = card_timestamp("no times here", date());
        assert_eq!(ts, date().and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn clock_time_parses_pm() {
        assert_eq!(
            find_clock_time("2:18 PM"),
            NaiveTime::from_hms_opt(14, 18, 0)
        );
    }
}
