//! Merge/dedup engine.
//!
//! Combines a freshly parsed event batch with the existing record for a
//! (child, date) without duplicating events already captured by earlier
//! passes. Identity is the content-derived fingerprint; the one stateful
//! exception is the open-nap rule, which lets a later pass complete a nap
//! observed earlier without an end time.

use chrono::NaiveDate;
use tracing::debug;

use super::models::{DailyRecord, Disposition, Event, EventDetails};

/// Result of merging one batch into one record.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub record: DailyRecord,
    /// Fingerprint of each incoming event paired with how it was handled
    pub dispositions: Vec<(String, Disposition)>,
}

/// Merge `incoming` into `existing` (or a fresh record when absent).
///
/// For each incoming event:
/// 1. fingerprint already present -> `Unchanged`, the stored instance wins;
/// 2. nap whose start matches a stored open nap -> in-place replace,
///    `Updated`;
/// 3. otherwise insert as `New`.
///
/// The returned record is re-sorted chronologically and its aggregates are
/// recomputed from scratch, so repeated merges of the same batch are
/// idempotent.
pub fn merge_events(
    existing: Option<DailyRecord>,
    child_id: &str,
    date: NaiveDate,
    incoming: Vec<Event>,
) -> MergeOutcome {
    let mut record = existing.unwrap_or_else(|| DailyRecord::new(child_id, date));
    let mut dispositions = Vec::with_capacity(incoming.len());

    for event in incoming {
        let fingerprint = event.fingerprint();
        let disposition = place_event(&mut record, event);
        debug!(%fingerprint, ?disposition, "merged event");
        dispositions.push((fingerprint, disposition));
    }

    record.normalize();
    MergeOutcome {
        record,
        dispositions,
    }
}

fn place_event(record: &mut DailyRecord, event: Event) -> Disposition {
    let fingerprint = event.fingerprint();
    if record
        .events
        .iter()
        .any(|e| e.fingerprint() == fingerprint)
    {
        return Disposition::Unchanged;
    }

    if let EventDetails::Nap { start, .. } = &event.details {
        let start = *start;
        if let Some(open) = record
            .events
            .iter_mut()
            .find(|e| e.is_open_nap() && nap_start(e) == Some(start))
        {
            *open = event;
            return Disposition::Updated;
        }
    }

    record.events.push(event);
    Disposition::New
}

fn nap_start(event: &Event) -> Option<chrono::NaiveDateTime> {
    match &event.details {
        EventDetails::Nap { start, .. } => Some(*start),
        _ => None,
    }
}
