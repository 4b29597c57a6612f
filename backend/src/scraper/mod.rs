//! Feed extraction: fetching, segmentation, attribution, and parsing.
//!
//! The pipeline is fetch -> segment -> {classroom resolve, extract} and every
//! stage past the fetch is pure. Extraction sits behind the [`CardExtractor`]
//! strategy seam so the regex parsers and the model-backed extractor are
//! interchangeable at configuration time.

pub mod ai;
pub mod classroom;
pub mod fetcher;
pub mod parsers;
pub mod segmenter;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::domain::models::EventDetails;

pub use classroom::{ClassroomDirectory, Resolution};
pub use segmenter::segment_feed;

/// Kind tag inferred for a raw card by the segmenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    SignIn,
    SignOut,
    Diaper,
    Bottle,
    Fluids,
    Nap,
    Meal,
    /// Recognized as a card but not as any parseable kind
    Unknown,
}

impl CardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardKind::SignIn => "sign_in",
            CardKind::SignOut => "sign_out",
            CardKind::Diaper => "diaper",
            CardKind::Bottle => "bottle",
            CardKind::Fluids => "fluids",
            CardKind::Nap => "nap",
            CardKind::Meal => "meal",
            CardKind::Unknown => "unknown",
        }
    }
}

/// One segmented event card: the raw text block plus its inferred kind.
///
/// Transient: produced by the segmenter, consumed by the matching extractor,
/// discarded after parsing.
#[derive(Debug, Clone)]
pub struct RawCard {
    pub kind: CardKind,
    /// Full card text, header line included
    pub text: String,
}

impl RawCard {
    /// The card's header line (first line of the block)
    pub fn header(&self) -> &str {
        self.text.lines().next().unwrap_or("").trim()
    }
}

/// A successfully extracted event, not yet attributed to a child.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEvent {
    pub timestamp: NaiveDateTime,
    pub details: EventDetails,
}

/// Extraction failure for a single card. Never aborts the pass.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Card matched a kind's header but its body fits no known sub-pattern
    #[error("card matched kind '{kind}' but no sub-pattern applied: {reason}")]
    UnparsableCard { kind: String, reason: String },
    /// Card kind was tagged `Unknown` by the segmenter
    #[error("card kind not recognized")]
    UnknownKind,
}

impl ExtractError {
    pub fn unparsable(kind: CardKind, reason: impl Into<String>) -> Self {
        ExtractError::UnparsableCard {
            kind: kind.as_str().to_string(),
            reason: reason.into(),
        }
    }
}

/// Strategy seam for turning a card into a typed event.
///
/// Implemented by [`parsers::RegexExtractor`] (default) and
/// [`ai::AiExtractor`] (model-backed). The engine selects one at
/// configuration time and is otherwise indifferent; both degrade to
/// [`ExtractError::UnparsableCard`] on input they cannot handle.
#[async_trait]
pub trait CardExtractor: Send + Sync {
    /// Bare times in the card resolve to wall-clock on `target_date`
    async fn extract(
        &self,
        card: &RawCard,
        target_date: NaiveDate,
    ) -> Result<ParsedEvent, ExtractError>;
}
