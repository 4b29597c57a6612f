//! Sign In / Sign Out parser.
//!
//! Attendance cards always carry a full `Occurred at Mon D, YYYY h:mm AM`
//! stamp; a bare clock time alone is not enough, since sign events from
//! adjacent days show up in the feed and must keep their own date.

use crate::domain::models::{AttendanceDirection, EventDetails};
use crate::scraper::ParsedEvent;

use super::timestamp::find_full_timestamp;

#[derive(Debug, Default)]
pub struct AttendanceParser;

impl AttendanceParser {
    pub fn parse(&self, text: &str, direction: AttendanceDirection) -> Result<ParsedEvent, String> {
        let timestamp =
            find_full_timestamp(text).ok_or("no full occurred-at timestamp in card")?;
        Ok(ParsedEvent {
            timestamp,
            details: EventDetails::Attendance { direction },
        })
    }
}
