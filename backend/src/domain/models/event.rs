//! Normalized feed events and their dedup fingerprints.
//!
//! The upstream portal exposes no stable event IDs, so identity across
//! scrape passes is content-derived: see [`Event::fingerprint`] for the
//! exact fields hashed per kind.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Kind tag for a normalized event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Bottle,
    Diaper,
    Nap,
    Fluids,
    Meal,
    Attendance,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Bottle => "bottle",
            EventKind::Diaper => "diaper",
            EventKind::Nap => "nap",
            EventKind::Fluids => "fluids",
            EventKind::Meal => "meal",
            EventKind::Attendance => "attendance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilkType {
    BreastMilk,
    Formula,
    Unspecified,
}

impl MilkType {
    pub fn label(&self) -> &'static str {
        match self {
            MilkType::BreastMilk => "Breast milk",
            MilkType::Formula => "Formula",
            MilkType::Unspecified => "Milk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiaperKind {
    Wet,
    Bm,
    /// Wet and BM on the same change; counts toward both totals
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepPosition {
    Back,
    Side,
    Stomach,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealKind {
    Breakfast,
    Lunch,
    Snack,
    Other,
}

impl MealKind {
    /// The portal rarely labels meals explicitly; derive from wall-clock hour
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=9 => MealKind::Breakfast,
            10..=13 => MealKind::Lunch,
            14..=16 => MealKind::Snack,
            _ => MealKind::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceDirection {
    CheckIn,
    CheckOut,
}

/// Kind-specific payload of a normalized event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventDetails {
    Bottle {
        milk_type: MilkType,
        ounces_offered: Option<f64>,
        ounces_consumed: f64,
    },
    Diaper {
        diaper_kind: DiaperKind,
        note: Option<String>,
    },
    Nap {
        start: NaiveDateTime,
        /// Absent while the child is still asleep at scrape time ("open" nap)
        end: Option<NaiveDateTime>,
        position: SleepPosition,
    },
    Fluids {
        ounces: f64,
        meal: Option<String>,
    },
    Meal {
        meal_kind: MealKind,
        items: Vec<String>,
    },
    Attendance {
        direction: AttendanceDirection,
    },
}

/// A single normalized event attributed to a child.
///
/// Timestamps are wall-clock in the portal's timezone; the engine never
/// converts between zones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub child_id: String,
    pub timestamp: NaiveDateTime,
    #[serde(flatten)]
    pub details: EventDetails,
}

impl Event {
    pub fn new(child_id: &str, timestamp: NaiveDateTime, details: EventDetails) -> Self {
        Self {
            child_id: child_id.to_string(),
            timestamp,
            details,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self.details {
            EventDetails::Bottle { .. } => EventKind::Bottle,
            EventDetails::Diaper { .. } => EventKind::Diaper,
            EventDetails::Nap { .. } => EventKind::Nap,
            EventDetails::Fluids { .. } => EventKind::Fluids,
            EventDetails::Meal { .. } => EventKind::Meal,
            EventDetails::Attendance { .. } => EventKind::Attendance,
        }
    }

    /// The calendar date this event belongs to
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Whether this is a nap without an observed end time
    pub fn is_open_nap(&self) -> bool {
        matches!(self.details, EventDetails::Nap { end: None, .. })
    }

    /// Nap duration in minutes; `None` for non-naps and open naps
    pub fn nap_minutes(&self) -> Option<i64> {
        match &self.details {
            EventDetails::Nap {
                start,
                end: Some(end),
                ..
            } => Some((*end - *start).num_minutes()),
            _ => None,
        }
    }

    /// Content-derived dedup key standing in for the missing upstream ID.
    ///
    /// SHA-256 over `kind|child_id|timestamp|salient`, hex-encoded and
    /// truncated to 16 bytes. The salient content per kind is:
    /// bottle: milk type, offered, consumed; diaper: kind, note;
    /// nap: start, end (`open` when absent), position; fluids: ounces, meal
    /// label; meal: meal kind, item list; attendance: direction.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind().as_str());
        hasher.update("|");
        hasher.update(&self.child_id);
        hasher.update("|");
        hasher.update(self.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string());
        hasher.update("|");
        hasher.update(self.salient_content());
        let digest = hasher.finalize();
        digest[..16].iter().map(|b| format!("{:02x}", b)).collect()
    }

    fn salient_content(&self) -> String {
        match &self.details {
            EventDetails::Bottle {
                milk_type,
                ounces_offered,
                ounces_consumed,
            } => format!(
                "{:?}:{}:{}",
                milk_type,
                ounces_offered.map(|o| o.to_string()).unwrap_or_default(),
                ounces_consumed
            ),
            EventDetails::Diaper { diaper_kind, note } => {
                format!("{:?}:{}", diaper_kind, note.as_deref().unwrap_or(""))
            }
            EventDetails::Nap {
                start,
                end,
                position,
            } => format!(
                "{}:{}:{:?}",
                start.format("%Y-%m-%dT%H:%M"),
                end.map(|e| e.format("%Y-%m-%dT%H:%M").to_string())
                    .unwrap_or_else(|| "open".to_string()),
                position
            ),
            EventDetails::Fluids { ounces, meal } => {
                format!("{}:{}", ounces, meal.as_deref().unwrap_or(""))
            }
            EventDetails::Meal { meal_kind, items } => {
                format!("{:?}:{}", meal_kind, items.join(","))
            }
            EventDetails::Attendance { direction } => format!("{:?}", direction),
        }
    }

    /// One-line human-readable description, used by the API layer
    pub fn describe(&self) -> String {
        match &self.details {
            EventDetails::Bottle {
                milk_type,
                ounces_consumed,
                ..
            } => format!("{}, {}oz consumed", milk_type.label(), ounces_consumed),
            EventDetails::Diaper { diaper_kind, note } => {
                let kind = match diaper_kind {
                    DiaperKind::Wet => "Wet",
                    DiaperKind::Bm => "BM",
                    DiaperKind::Both => "Wet + BM",
                };
                match note {
                    Some(n) => format!("Diaper ({}) — {}", kind, n),
                    None => format!("Diaper ({})", kind),
                }
            }
            EventDetails::Nap { start, end, .. } => match end {
                Some(e) => format!(
                    "Nap {} – {}",
                    start.format("%H:%M"),
                    e.format("%H:%M")
                ),
                None => format!("Nap from {} (ongoing)", start.format("%H:%M")),
            },
            EventDetails::Fluids { ounces, meal } => match meal {
                Some(m) => format!("Fluids {}oz ({})", ounces, m),
                None => format!("Fluids {}oz", ounces),
            },
            EventDetails::Meal { items, .. } => format!("Meal: {}", items.join(", ")),
            EventDetails::Attendance { direction } => match direction {
                AttendanceDirection::CheckIn => "Signed in".to_string(),
                AttendanceDirection::CheckOut => "Signed out".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 30)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn fingerprint_is_stable_across_clones() {
        let event = Event::new(
            "child::ezra",
            ts(11, 35),
            EventDetails::Bottle {
                milk_type: MilkType::BreastMilk,
                ounces_offered: Some(4.0),
                ounces_consumed: 3.5,
            },
        );
        assert_eq!(event.fingerprint(), event.clone().fingerprint());
        assert_eq!(event.fingerprint().len(), 32);
    }

    #[test]
    fn fingerprint_differs_by_content() {
        let base = Event::new(
            "child::ezra",
            ts(11, 35),
            EventDetails::Bottle {
                milk_type: MilkType::BreastMilk,
                ounces_offered: None,
                ounces_consumed: 3.5,
            },
        );
        let mut other = base.clone();
        other.details = EventDetails::Bottle {
            milk_type: MilkType::BreastMilk,
            ounces_offered: None,
            ounces_consumed: 3.6,
        };
        assert_ne!(base.fingerprint(), other.fingerprint());

        let mut other_child = base.clone();
        other_child.child_id = "child::killian".to_string();
        assert_ne!(base.fingerprint(), other_child.fingerprint());
    }

    #[test]
    fn open_and_closed_naps_fingerprint_differently() {
        let open = Event::new(
            "child::ezra",
            ts(13, 18),
            EventDetails::Nap {
                start: ts(13, 18),
                end: None,
                position: SleepPosition::Back,
            },
        );
        let closed = Event::new(
            "child::ezra",
            ts(13, 18),
            EventDetails::Nap {
                start: ts(13, 18),
                end: Some(ts(13, 38)),
                position: SleepPosition::Back,
            },
        );
        assert!(open.is_open_nap());
        assert!(!closed.is_open_nap());
        assert_ne!(open.fingerprint(), closed.fingerprint());
        assert_eq!(closed.nap_minutes(), Some(20));
        assert_eq!(open.nap_minutes(), None);
    }

    #[test]
    fn meal_kind_from_hour() {
        assert_eq!(MealKind::from_hour(8), MealKind::Breakfast);
        assert_eq!(MealKind::from_hour(12), MealKind::Lunch);
        assert_eq!(MealKind::from_hour(15), MealKind::Snack);
        assert_eq!(MealKind::from_hour(18), MealKind::Other);
    }

    #[test]
    fn event_serializes_with_kind_tag() {
        let event = Event::new(
            "child::ezra",
            ts(9, 0),
            EventDetails::Attendance {
                direction: AttendanceDirection::CheckIn,
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"attendance\""));
        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
