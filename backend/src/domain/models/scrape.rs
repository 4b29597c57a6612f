//! Outcome types for one scrape pass.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Per-event merge disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    New,
    Updated,
    Unchanged,
}

/// A parse-coverage or attribution problem encountered during a pass.
///
/// Warnings itemize everything that was excluded from merge; a pass never
/// aborts wholesale because of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum ScrapeWarning {
    /// Card matched no recognized kind header
    UnknownCard { header: String },
    /// Card matched a kind but no sub-pattern applied to its body
    UnparsableCard { kind: String, reason: String },
    /// "Recorded by" label matched no configured child
    UnresolvedClassroom { label: String },
    /// Label shared by several children with no disambiguating name mention
    AmbiguousClassroom {
        label: String,
        candidates: Vec<String>,
    },
    /// Persisting one child's record failed; other children still completed
    ChildStorageFailed { child_id: String, message: String },
}

/// Counters for one child within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChildPassStats {
    pub new: u32,
    pub updated: u32,
    pub unchanged: u32,
}

impl ChildPassStats {
    pub fn observe(&mut self, disposition: Disposition) {
        match disposition {
            Disposition::New => self.new += 1,
            Disposition::Updated => self.updated += 1,
            Disposition::Unchanged => self.unchanged += 1,
        }
    }
}

/// Outcome of one scrape pass, persisted to the bounded scrape log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub date: NaiveDate,
    pub success: bool,
    pub message: Option<String>,
    pub per_child: BTreeMap<String, ChildPassStats>,
    pub warnings: Vec<ScrapeWarning>,
    pub duration_ms: u64,
}

impl ScrapeResult {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            success: true,
            message: None,
            per_child: BTreeMap::new(),
            warnings: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.success = false;
        self.message = Some(message.into());
        self
    }

    /// Events observed across all children, any disposition
    pub fn total_events(&self) -> u32 {
        self.per_child
            .values()
            .map(|s| s.new + s.updated + s.unchanged)
            .sum()
    }

    /// Events that changed stored state this pass
    pub fn changed_events(&self) -> u32 {
        self.per_child.values().map(|s| s.new + s.updated).sum()
    }
}

/// One row of the scrape log, as read back from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeLogEntry {
    pub id: i64,
    pub timestamp: NaiveDateTime,
    pub success: bool,
    pub message: Option<String>,
    pub events_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_accumulate_dispositions() {
        let mut stats = ChildPassStats::default();
        stats.observe(Disposition::New);
        stats.observe(Disposition::New);
        stats.observe(Disposition::Updated);
        stats.observe(Disposition::Unchanged);
        assert_eq!(stats.new, 2);
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.unchanged, 1);
    }

    #[test]
    fn result_totals_span_children() {
        let mut result = ScrapeResult::new(NaiveDate::from_ymd_opt(2026, 1, 30).unwrap());
        result.per_child.insert(
            "child::ezra".to_string(),
            ChildPassStats {
                new: 3,
                updated: 1,
                unchanged: 2,
            },
        );
        result.per_child.insert(
            "child::killian".to_string(),
            ChildPassStats {
                new: 1,
                updated: 0,
                unchanged: 4,
            },
        );
        assert_eq!(result.total_events(), 11);
        assert_eq!(result.changed_events(), 5);
    }
}
