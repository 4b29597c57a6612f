//! Nap parser.
//!
//! Two interval forms:
//! 1. closed: `From Jan 30, 2026 1:18 PM until 1:38 PM` — the end time
//!    shares the start's date;
//! 2. open: `Occurred at Jan 30, 2026 1:10 PM` — the child was still asleep
//!    at scrape time; a later pass may complete the interval.
//!
//! Sleep position rides along as a keyword (`· Back`).

use chrono::NaiveDate;
use regex::Regex;

use crate::domain::models::{EventDetails, SleepPosition};
use crate::scraper::ParsedEvent;

use super::timestamp::{month_number, to_24h};

const MONTHS: &str = "Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec";

#[derive(Debug)]
pub struct NapParser {
    from_until: Regex,
    occurred_at: Regex,
}

impl NapParser {
    pub fn new() -> Self {
        Self {
            from_until: Regex::new(&format!(
                r"(?i)From\s+({MONTHS})\s+(\d{{1,2}}),?\s+(\d{{4}})\s+(\d{{1,2}}):(\d{{2}})\s*(AM|PM)\s+until\s+(\d{{1,2}}):(\d{{2}})\s*(AM|PM)"
            ))
            .expect("from-until pattern is valid"),
            occurred_at: Regex::new(&format!(
                r"(?i)Occurred at\s+({MONTHS})\s+(\d{{1,2}}),?\s+(\d{{4}})\s+(\d{{1,2}}):(\d{{2}})\s*(AM|PM)"
            ))
            .expect("occurred-at pattern is valid"),
        }
    }

    pub fn parse(&self, text: &str) -> Result<ParsedEvent, String> {
        let position = Self::position(text);

        if let Some(caps) = self.from_until.captures(text) {
            let date = Self::capture_date(&caps[1], &caps[2], &caps[3])?;
            let start = date
                .and_hms_opt(
                    to_24h(caps[4].parse().map_err(|_| "bad start hour")?, &caps[6]),
                    caps[5].parse().map_err(|_| "bad start minute")?,
                    0,
                )
                .ok_or("start time out of range")?;
            let end = date
                .and_hms_opt(
                    to_24h(caps[7].parse().map_err(|_| "bad end hour")?, &caps[9]),
                    caps[8].parse().map_err(|_| "bad end minute")?,
                    0,
                )
                .ok_or("end time out of range")?;
            return Ok(ParsedEvent {
                timestamp: start,
                details: EventDetails::Nap {
                    start,
                    end: Some(end),
                    position,
                },
            });
        }

        if let Some(caps) = self.occurred_at.captures(text) {
            let date = Self::capture_date(&caps[1], &caps[2], &caps[3])?;
            let start = date
                .and_hms_opt(
                    to_24h(caps[4].parse().map_err(|_| "bad hour")?, &caps[6]),
                    caps[5].parse().map_err(|_| "bad minute")?,
                    0,
                )
                .ok_or("time out of range")?;
            return Ok(ParsedEvent {
                timestamp: start,
                details: EventDetails::Nap {
                    start,
                    end: None,
                    position,
                },
            });
        }

        Err("no nap interval pattern matched".to_string())
    }

    fn capture_date(month: &str, day: &str, year: &str) -> Result<NaiveDate, String> {
        NaiveDate::from_ymd_opt(
            year.parse().map_err(|_| "bad year")?,
            month_number(month),
            day.parse().map_err(|_| "bad day")?,
        )
        .ok_or_else(|| "date out of range".to_string())
    }

    fn position(text: &str) -> SleepPosition {
        let lower = text.to_lowercase();
        if lower.contains("back") {
            SleepPosition::Back
        } else if lower.contains("side") {
            SleepPosition::Side
        } else if lower.contains("stomach") || lower.contains("tummy") {
            SleepPosition::Stomach
        } else {
            SleepPosition::Unknown
        }
    }
}

impl Default for NapParser {
    fn default() -> Self {
        Self::new()
    }
}
