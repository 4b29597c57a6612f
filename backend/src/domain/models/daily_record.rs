//! Per-(child, date) event record with derived aggregates.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::event::{AttendanceDirection, DiaperKind, Event, EventDetails};

/// The persisted, aggregate-bearing event set for one child on one date.
///
/// Invariant: `totals` is always a pure function of `events`. Every mutation
/// goes through [`DailyRecord::normalize`], which re-sorts chronologically
/// and recomputes the aggregates from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub child_id: String,
    pub date: NaiveDate,
    /// Chronologically ordered event sequence
    pub events: Vec<Event>,
    pub totals: DailyTotals,
}

impl DailyRecord {
    pub fn new(child_id: &str, date: NaiveDate) -> Self {
        Self {
            child_id: child_id.to_string(),
            date,
            events: Vec::new(),
            totals: DailyTotals::default(),
        }
    }

    /// Restore the record invariants after its event set changed
    pub fn normalize(&mut self) {
        self.events.sort_by_key(|e| e.timestamp);
        self.totals = DailyTotals::from_events(&self.events);
    }
}

/// Aggregates derived from a day's events.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyTotals {
    /// Bottle ounces consumed + fluid ounces
    pub total_ounces: f64,
    pub bottle_ounces: f64,
    pub fluid_ounces: f64,
    pub wet_diapers: u32,
    pub bm_diapers: u32,
    /// Closed naps only; open naps contribute once completed
    pub nap_minutes: i64,
    pub meal_count: u32,
    pub first_check_in: Option<NaiveDateTime>,
    pub last_check_out: Option<NaiveDateTime>,
}

impl DailyTotals {
    pub fn from_events(events: &[Event]) -> Self {
        let mut totals = DailyTotals::default();
        for event in events {
            match &event.details {
                EventDetails::Bottle {
                    ounces_consumed, ..
                } => {
                    totals.bottle_ounces += ounces_consumed;
                }
                EventDetails::Fluids { ounces, .. } => {
                    totals.fluid_ounces += ounces;
                }
                EventDetails::Diaper { diaper_kind, .. } => match diaper_kind {
                    DiaperKind::Wet => totals.wet_diapers += 1,
                    DiaperKind::Bm => totals.bm_diapers += 1,
                    DiaperKind::Both => {
                        totals.wet_diapers += 1;
                        totals.bm_diapers += 1;
                    }
                },
                EventDetails::Nap { .. } => {
                    if let Some(minutes) = event.nap_minutes() {
                        totals.nap_minutes += minutes;
                    }
                }
                EventDetails::Meal { .. } => totals.meal_count += 1,
                EventDetails::Attendance { direction } => match direction {
                    AttendanceDirection::CheckIn => {
                        if totals
                            .first_check_in
                            .map_or(true, |t| event.timestamp < t)
                        {
                            totals.first_check_in = Some(event.timestamp);
                        }
                    }
                    AttendanceDirection::CheckOut => {
                        if totals
                            .last_check_out
                            .map_or(true, |t| event.timestamp > t)
                        {
                            totals.last_check_out = Some(event.timestamp);
                        }
                    }
                },
            }
        }
        totals.total_ounces = totals.bottle_ounces + totals.fluid_ounces;
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::event::{MealKind, MilkType, SleepPosition};

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 30)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn bottle(h: u32, m: u32, consumed: f64) -> Event {
        Event::new(
            "child::ezra",
            ts(h, m),
            EventDetails::Bottle {
                milk_type: MilkType::BreastMilk,
                ounces_offered: None,
                ounces_consumed: consumed,
            },
        )
    }

    #[test]
    fn totals_sum_bottles_and_fluids() {
        let events = vec![
            bottle(11, 35, 3.5),
            bottle(14, 18, 3.6),
            Event::new(
                "child::ezra",
                ts(12, 0),
                EventDetails::Fluids {
                    ounces: 2.0,
                    meal: Some("Lunch".to_string()),
                },
            ),
        ];
        let totals = DailyTotals::from_events(&events);
        assert!((totals.bottle_ounces - 7.1).abs() < 1e-9);
        assert!((totals.fluid_ounces - 2.0).abs() < 1e-9);
        assert!((totals.total_ounces - 9.1).abs() < 1e-9);
    }

    #[test]
    fn diaper_counts_match_literal_kinds() {
        let mk = |kind| {
            Event::new(
                "child::ezra",
                ts(10, 0),
                EventDetails::Diaper {
                    diaper_kind: kind,
                    note: None,
                },
            )
        };
        let events = vec![
            mk(DiaperKind::Wet),
            mk(DiaperKind::Wet),
            mk(DiaperKind::Bm),
            mk(DiaperKind::Both),
        ];
        let totals = DailyTotals::from_events(&events);
        assert_eq!(totals.wet_diapers, 3);
        assert_eq!(totals.bm_diapers, 2);
    }

    #[test]
    fn open_naps_do_not_count_minutes() {
        let events = vec![
            Event::new(
                "child::ezra",
                ts(13, 18),
                EventDetails::Nap {
                    start: ts(13, 18),
                    end: Some(ts(13, 38)),
                    position: SleepPosition::Back,
                },
            ),
            Event::new(
                "child::ezra",
                ts(15, 0),
                EventDetails::Nap {
                    start: ts(15, 0),
                    end: None,
                    position: SleepPosition::Unknown,
                },
            ),
        ];
        let totals = DailyTotals::from_events(&events);
        assert_eq!(totals.nap_minutes, 20);
    }

    #[test]
    fn attendance_tracks_first_in_and_last_out() {
        let att = |h, m, direction| {
            Event::new(
                "child::ezra",
                ts(h, m),
                EventDetails::Attendance { direction },
            )
        };
        let events = vec![
            att(8, 30, AttendanceDirection::CheckIn),
            att(7, 24, AttendanceDirection::CheckIn),
            att(16, 45, AttendanceDirection::CheckOut),
            att(17, 10, AttendanceDirection::CheckOut),
        ];
        let totals = DailyTotals::from_events(&events);
        assert_eq!(totals.first_check_in, Some(ts(7, 24)));
        assert_eq!(totals.last_check_out, Some(ts(17, 10)));
    }

    #[test]
    fn normalize_sorts_and_recomputes() {
        let mut record = DailyRecord::new("child::ezra", ts(0, 0).date());
        record.events = vec![bottle(14, 18, 3.6), bottle(11, 35, 3.5)];
        record.normalize();
        assert_eq!(record.events[0].timestamp, ts(11, 35));
        assert!((record.totals.total_ounces - 7.1).abs() < 1e-9);

        // meal count is part of the recompute
        record.events.push(Event::new(
            "child::ezra",
            ts(12, 0),
            EventDetails::Meal {
                meal_kind: MealKind::Lunch,
                items: vec!["pasta".to_string()],
            },
        ));
        record.normalize();
        assert_eq!(record.totals.meal_count, 1);
    }
}
