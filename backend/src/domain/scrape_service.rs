//! One scrape pass, end to end.
//!
//! The pipeline is sequential and damage-limited: one bad card becomes a
//! warning, one failing child save becomes a warning, and only a failed
//! fetch (or an empty classroom table) fails the pass itself.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::notify::Notifier;
use crate::scraper::fetcher::{fetch_with_retry, FeedSource, RetryPolicy};
use crate::scraper::{
    segment_feed, CardExtractor, CardKind, ClassroomDirectory, ExtractError, Resolution,
};
use crate::storage::{DailyRecordStorage, ScrapeLogStorage};

use super::merge::merge_events;
use super::models::{ChildPassStats, DailyRecord, Event, ScrapeResult, ScrapeWarning};

/// A manual trigger found a pass already holding the session.
#[derive(Debug, Error)]
#[error("a scrape pass is already in flight")]
pub struct PassInFlight;

pub struct ScrapeService {
    /// The authenticated session; the mutex is the pass-level mutual exclusion
    pub(crate) session: Arc<Mutex<Box<dyn FeedSource>>>,
    directory: ClassroomDirectory,
    extractor: Arc<dyn CardExtractor>,
    records: Arc<dyn DailyRecordStorage>,
    log: Arc<dyn ScrapeLogStorage>,
    notifier: Arc<dyn Notifier>,
    retry: RetryPolicy,
}

impl ScrapeService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: Arc<Mutex<Box<dyn FeedSource>>>,
        directory: ClassroomDirectory,
        extractor: Arc<dyn CardExtractor>,
        records: Arc<dyn DailyRecordStorage>,
        log: Arc<dyn ScrapeLogStorage>,
        notifier: Arc<dyn Notifier>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            session,
            directory,
            extractor,
            records,
            log,
            notifier,
            retry,
        }
    }

    /// Run a pass, waiting for any in-flight pass to finish first.
    /// Used by the scheduler.
    pub async fn run_pass(&self, date: NaiveDate, notify: bool) -> ScrapeResult {
        let mut source = self.session.lock().await;
        self.run_locked(source.as_mut(), date, notify).await
    }

    /// Run a pass only if none is in flight. Used by the manual REST trigger.
    pub async fn try_run_pass(
        &self,
        date: NaiveDate,
        notify: bool,
    ) -> Result<ScrapeResult, PassInFlight> {
        let mut source = self.session.try_lock().map_err(|_| PassInFlight)?;
        Ok(self.run_locked(source.as_mut(), date, notify).await)
    }

    async fn run_locked(
        &self,
        source: &mut dyn FeedSource,
        date: NaiveDate,
        notify: bool,
    ) -> ScrapeResult {
        let started = Instant::now();
        info!(%date, "scrape pass starting");

        if self.directory.is_empty() {
            let mut result = ScrapeResult::new(date).fail("no children configured");
            self.finish(&mut result, started, notify, Vec::new()).await;
            return result;
        }

        let feed = match fetch_with_retry(source, date, self.retry).await {
            Ok(feed) => feed,
            Err(err) => {
                warn!(%err, "fetch failed, pass abandoned");
                let mut result = ScrapeResult::new(date).fail(err.to_string());
                self.finish(&mut result, started, notify, Vec::new()).await;
                return result;
            }
        };

        let mut result = ScrapeResult::new(date);
        let mut by_child: BTreeMap<(String, NaiveDate), Vec<Event>> = BTreeMap::new();

        for card in segment_feed(&feed) {
            if card.kind == CardKind::Unknown {
                result.warnings.push(ScrapeWarning::UnknownCard {
                    header: card.header().to_string(),
                });
                continue;
            }

            let child_id = match self.directory.resolve(&card) {
                Resolution::Child(id) => id,
                Resolution::Unresolved { label } => {
                    warn!(%label, kind = card.kind.as_str(), "card left unattributed");
                    result
                        .warnings
                        .push(ScrapeWarning::UnresolvedClassroom { label });
                    continue;
                }
                Resolution::Ambiguous { label, candidates } => {
                    warn!(%label, ?candidates, "card matched several children");
                    result
                        .warnings
                        .push(ScrapeWarning::AmbiguousClassroom { label, candidates });
                    continue;
                }
            };

            match self.extractor.extract(&card, date).await {
                Ok(parsed) => {
                    let event = Event::new(&child_id, parsed.timestamp, parsed.details);
                    by_child
                        .entry((child_id, event.date()))
                        .or_default()
                        .push(event);
                }
                Err(ExtractError::UnparsableCard { kind, reason }) => {
                    warn!(%kind, %reason, "card body did not parse");
                    result
                        .warnings
                        .push(ScrapeWarning::UnparsableCard { kind, reason });
                }
                Err(ExtractError::UnknownKind) => {
                    result.warnings.push(ScrapeWarning::UnknownCard {
                        header: card.header().to_string(),
                    });
                }
            }
        }

        let mut changed_records = Vec::new();
        for ((child_id, event_date), events) in by_child {
            match self.merge_and_save(&child_id, event_date, events).await {
                Ok((stats, record)) => {
                    let entry = result.per_child.entry(child_id).or_default();
                    entry.new += stats.new;
                    entry.updated += stats.updated;
                    entry.unchanged += stats.unchanged;
                    if stats.new + stats.updated > 0 {
                        changed_records.push(record);
                    }
                }
                Err(message) => {
                    warn!(child = %child_id, %message, "child record not saved");
                    result
                        .warnings
                        .push(ScrapeWarning::ChildStorageFailed { child_id, message });
                }
            }
        }

        info!(
            events = result.total_events(),
            changed = result.changed_events(),
            warnings = result.warnings.len(),
            "scrape pass finished"
        );
        self.finish(&mut result, started, notify, changed_records)
            .await;
        result
    }

    /// Merge fully in memory, then save once. A failure leaves the stored
    /// record exactly as the previous pass wrote it.
    async fn merge_and_save(
        &self,
        child_id: &str,
        date: NaiveDate,
        events: Vec<Event>,
    ) -> Result<(ChildPassStats, DailyRecord), String> {
        let existing = self
            .records
            .load(child_id, date)
            .await
            .map_err(|e| e.to_string())?;
        let outcome = merge_events(existing, child_id, date, events);

        let mut stats = ChildPassStats::default();
        for (_, disposition) in &outcome.dispositions {
            stats.observe(*disposition);
        }

        if stats.new + stats.updated > 0 {
            self.records
                .save(&outcome.record)
                .await
                .map_err(|e| e.to_string())?;
        }
        Ok((stats, outcome.record))
    }

    async fn finish(
        &self,
        result: &mut ScrapeResult,
        started: Instant,
        notify: bool,
        changed_records: Vec<DailyRecord>,
    ) {
        result.duration_ms = started.elapsed().as_millis() as u64;
        if let Err(err) = self.log.log_pass(result).await {
            warn!(%err, "could not record pass in scrape log");
        }
        if notify && result.changed_events() > 0 {
            self.notifier.pass_completed(result, &changed_records).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Child;
    use crate::notify::LogNotifier;
    use crate::scraper::fetcher::FetchError;
    use crate::scraper::parsers::RegexExtractor;
    use crate::storage::SqliteStore;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedFeed(String);

    #[async_trait]
    impl FeedSource for FixedFeed {
        async fn fetch_feed(&mut self, _date: NaiveDate) -> Result<String, FetchError> {
            Ok(self.0.clone())
        }

        async fn reauthenticate(&mut self) -> Result<(), FetchError> {
            Ok(())
        }
    }

    struct SlowFeed(Duration);

    #[async_trait]
    impl FeedSource for SlowFeed {
        async fn fetch_feed(&mut self, _date: NaiveDate) -> Result<String, FetchError> {
            tokio::time::sleep(self.0).await;
            Ok(String::new())
        }

        async fn reauthenticate(&mut self) -> Result<(), FetchError> {
            Ok(())
        }
    }

    struct DownFeed;

    #[async_trait]
    impl FeedSource for DownFeed {
        async fn fetch_feed(&mut self, _date: NaiveDate) -> Result<String, FetchError> {
            Err(FetchError::FeedUnavailable("503".to_string()))
        }

        async fn reauthenticate(&mut self) -> Result<(), FetchError> {
            Ok(())
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 30).unwrap()
    }

    fn directory() -> ClassroomDirectory {
        ClassroomDirectory::new(vec![
            Child::new("Ezra Aschenberg", vec!["Infant C".to_string()]),
            Child::new("Killian Aschenberg", vec!["Older P".to_string()]),
        ])
    }

    async fn service(feed: Box<dyn FeedSource>) -> (ScrapeService, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::connect_test().await.unwrap());
        let service = ScrapeService::new(
            Arc::new(Mutex::new(feed)),
            directory(),
            Arc::new(RegexExtractor::new()),
            store.clone(),
            store.clone(),
            Arc::new(LogNotifier),
            RetryPolicy {
                transient_attempts: 1,
                initial_backoff: Duration::from_millis(1),
            },
        );
        (service, store)
    }

    const TWO_BOTTLES: &str = "Feed\n\
Bottle\n\
Recorded by Infant C.\n\
11:35 AM\n\
Breast milk\n\
Ounces Offered\n\
4\n\
Ounces Consumed\n\
3.5\n\
Bottle\n\
Recorded by Infant C.\n\
2:18 PM\n\
Breast milk consumed 3.6oz\n";

    #[tokio::test]
    async fn two_bottles_merge_into_one_child_record() {
        let (service, store) = service(Box::new(FixedFeed(TWO_BOTTLES.to_string()))).await;
        let result = service.run_pass(date(), false).await;

        assert!(result.success);
        assert!(result.warnings.is_empty());
        let stats = &result.per_child["child::ezra-aschenberg"];
        assert_eq!(stats.new, 2);

        let record = store
            .load("child::ezra-aschenberg", date())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.events.len(), 2);
        assert!((record.totals.total_ounces - 7.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn rerunning_the_same_feed_changes_nothing() {
        let (service, store) = service(Box::new(FixedFeed(TWO_BOTTLES.to_string()))).await;
        service.run_pass(date(), false).await;
        let second = service.run_pass(date(), false).await;

        let stats = &second.per_child["child::ezra-aschenberg"];
        assert_eq!(stats.new, 0);
        assert_eq!(stats.unchanged, 2);

        let record = store
            .load("child::ezra-aschenberg", date())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.events.len(), 2);
    }

    #[tokio::test]
    async fn unresolved_classroom_yields_warning_and_no_record() {
        let feed = "Bottle\nRecorded by Toddler Z.\n11:35 AM\nOunces Consumed\n3.5\n";
        let (service, store) = service(Box::new(FixedFeed(feed.to_string()))).await;
        let result = service.run_pass(date(), false).await;

        assert!(result.success);
        assert_eq!(result.total_events(), 0);
        assert_eq!(
            result.warnings,
            vec![ScrapeWarning::UnresolvedClassroom {
                label: "Toddler Z".to_string()
            }]
        );
        assert!(store.load_all_for_date(date()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unparsable_card_is_a_warning_not_a_failure() {
        let feed = "Bottle\nRecorded by Infant C.\nno amounts here\n\
Diaper\nRecorded by Infant C.\n10:02 AM\nWet\n";
        let (service, _) = service(Box::new(FixedFeed(feed.to_string()))).await;
        let result = service.run_pass(date(), false).await;

        assert!(result.success);
        assert_eq!(result.total_events(), 1);
        assert!(matches!(
            result.warnings.as_slice(),
            [ScrapeWarning::UnparsableCard { kind, .. }] if kind == "bottle"
        ));
    }

    #[tokio::test]
    async fn empty_feed_is_a_successful_empty_pass() {
        let (service, _) = service(Box::new(FixedFeed(String::new()))).await;
        let result = service.run_pass(date(), false).await;
        assert!(result.success);
        assert_eq!(result.total_events(), 0);
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn returned_result_carries_the_pass_duration() {
        let (service, _) = service(Box::new(SlowFeed(Duration::from_millis(80)))).await;
        let result = service.run_pass(date(), false).await;
        assert!(result.success);
        assert!(
            result.duration_ms >= 80,
            "pass took >=80ms but caller saw duration_ms={}",
            result.duration_ms
        );
    }

    struct SlowDownFeed(Duration);

    #[async_trait]
    impl FeedSource for SlowDownFeed {
        async fn fetch_feed(&mut self, _date: NaiveDate) -> Result<String, FetchError> {
            tokio::time::sleep(self.0).await;
            Err(FetchError::FeedUnavailable("503".to_string()))
        }

        async fn reauthenticate(&mut self) -> Result<(), FetchError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_pass_still_reports_its_duration() {
        let (service, _) = service(Box::new(SlowDownFeed(Duration::from_millis(40)))).await;
        let result = service.run_pass(date(), false).await;
        assert!(!result.success);
        assert!(result.duration_ms >= 40);
    }

    #[tokio::test]
    async fn fetch_failure_fails_the_pass_and_is_logged() {
        let (service, store) = service(Box::new(DownFeed)).await;
        let result = service.run_pass(date(), false).await;

        assert!(!result.success);
        assert!(result.message.as_deref().unwrap_or("").contains("503"));

        let last = store.last_pass().await.unwrap().unwrap();
        assert!(!last.success);
    }

    #[tokio::test]
    async fn manual_trigger_is_rejected_while_a_pass_holds_the_session() {
        let (service, _) = service(Box::new(FixedFeed(String::new()))).await;
        let guard = service.session.lock().await;
        assert!(service.try_run_pass(date(), false).await.is_err());
        drop(guard);
        assert!(service.try_run_pass(date(), false).await.is_ok());
    }

    #[tokio::test]
    async fn events_group_by_their_own_date() {
        // A sign-out from the previous evening shows up in today's feed
        let feed = "Sign Out · Ezra Aschenberg\n\
Recorded by Sarah A.\n\
Occurred at Jan 29, 2026 4:55 PM\n\
Diaper\nRecorded by Infant C.\n10:02 AM\nWet\n";
        let (service, store) = service(Box::new(FixedFeed(feed.to_string()))).await;
        service.run_pass(date(), false).await;

        let yesterday = NaiveDate::from_ymd_opt(2026, 1, 29).unwrap();
        let old = store
            .load("child::ezra-aschenberg", yesterday)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(old.events.len(), 1);

        let today = store
            .load("child::ezra-aschenberg", date())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(today.events.len(), 1);
        assert_eq!(today.totals.wet_diapers, 1);
    }
}
