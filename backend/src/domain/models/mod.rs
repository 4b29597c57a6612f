//! Domain models for the feed extraction engine.

pub mod child;
pub mod daily_record;
pub mod event;
pub mod scrape;

pub use child::Child;
pub use daily_record::{DailyRecord, DailyTotals};
pub use event::{
    AttendanceDirection, DiaperKind, Event, EventDetails, EventKind, MealKind, MilkType,
    SleepPosition,
};
pub use scrape::{ChildPassStats, Disposition, ScrapeLogEntry, ScrapeResult, ScrapeWarning};
