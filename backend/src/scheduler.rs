//! Periodic scrape loop.
//!
//! Every interval tick runs a pass for "today" (wall-clock, local). The
//! service's session mutex serializes this against manual REST triggers.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::domain::ScrapeService;

pub struct Scheduler {
    service: Arc<ScrapeService>,
    interval: Duration,
    run_on_startup: bool,
}

impl Scheduler {
    pub fn new(service: Arc<ScrapeService>, interval_minutes: u64, run_on_startup: bool) -> Self {
        Self {
            service,
            interval: Duration::from_secs(interval_minutes * 60),
            run_on_startup,
        }
    }

    /// Run forever; spawn this on the runtime.
    pub async fn run(self) {
        info!(
            interval_minutes = self.interval.as_secs() / 60,
            run_on_startup = self.run_on_startup,
            "scheduler starting"
        );

        let mut ticker = tokio::time::interval(self.interval);
        if !self.run_on_startup {
            // interval fires immediately on the first tick
            ticker.tick().await;
        }

        loop {
            ticker.tick().await;
            let today = chrono::Local::now().date_naive();
            let result = self.service.run_pass(today, true).await;
            info!(
                date = %today,
                success = result.success,
                events = result.total_events(),
                changed = result.changed_events(),
                "scheduled pass done"
            );
        }
    }
}
