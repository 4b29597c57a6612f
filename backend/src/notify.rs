//! Notification seam for completed scrape passes.
//!
//! The engine only calls the trait; what "notify" concretely means (push,
//! email, nothing) is the implementation's business. The default just logs.

use async_trait::async_trait;
use tracing::info;

use crate::domain::models::{DailyRecord, ScrapeResult};

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Called after a pass that changed stored state, with the records as
    /// they stand after the merge
    async fn pass_completed(&self, result: &ScrapeResult, records: &[DailyRecord]);
}

/// Default notifier: a structured log line per child.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn pass_completed(&self, result: &ScrapeResult, records: &[DailyRecord]) {
        info!(
            date = %result.date,
            changed = result.changed_events(),
            "scrape pass changed stored state"
        );
        for record in records {
            info!(
                child = %record.child_id,
                events = record.events.len(),
                total_ounces = record.totals.total_ounces,
                "updated daily record"
            );
        }
    }
}
