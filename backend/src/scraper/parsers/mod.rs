//! Regex-based card parsers, one per card kind.
//!
//! [`RegexExtractor`] dispatches on the segmenter's kind tag and maps each
//! parser's string error into an unparsable-card warning; it never invents a
//! value a sub-pattern did not capture.

pub mod attendance;
pub mod bottle;
pub mod diaper;
pub mod fluids;
pub mod meal;
pub mod nap;
pub mod timestamp;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::models::AttendanceDirection;

use super::{CardExtractor, CardKind, ExtractError, ParsedEvent, RawCard};

pub use attendance::AttendanceParser;
pub use bottle::BottleParser;
pub use diaper::DiaperParser;
pub use fluids::FluidsParser;
pub use meal::MealParser;
pub use nap::NapParser;

/// The default extractor: deterministic regexes, no network.
#[derive(Debug, Default)]
pub struct RegexExtractor {
    bottle: BottleParser,
    diaper: DiaperParser,
    nap: NapParser,
    fluids: FluidsParser,
    meal: MealParser,
    attendance: AttendanceParser,
}

impl RegexExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_sync(
        &self,
        card: &RawCard,
        target_date: NaiveDate,
    ) -> Result<ParsedEvent, ExtractError> {
        let fail = |reason: String| ExtractError::unparsable(card.kind, reason);

        match card.kind {
            CardKind::Bottle => {
                let details = self.bottle.parse(&card.text).map_err(fail)?;
                Ok(ParsedEvent {
                    timestamp: timestamp::card_timestamp(&card.text, target_date),
                    details,
                })
            }
            CardKind::Diaper => {
                let details = self.diaper.parse(&card.text).map_err(fail)?;
                Ok(ParsedEvent {
                    timestamp: timestamp::card_timestamp(&card.text, target_date),
                    details,
                })
            }
            // Naps and attendance carry their timestamps inside the matched
            // pattern, so the generic fallback is not used
            CardKind::Nap => self.nap.parse(&card.text).map_err(fail),
            CardKind::Fluids => {
                let details = self.fluids.parse(&card.text).map_err(fail)?;
                Ok(ParsedEvent {
                    timestamp: timestamp::card_timestamp(&card.text, target_date),
                    details,
                })
            }
            CardKind::Meal => {
                let ts = timestamp::card_timestamp(&card.text, target_date);
                let details = self.meal.parse(&card.text, ts).map_err(fail)?;
                Ok(ParsedEvent {
                    timestamp: ts,
                    details,
                })
            }
            CardKind::SignIn => self
                .attendance
                .parse(&card.text, AttendanceDirection::CheckIn)
                .map_err(fail),
            CardKind::SignOut => self
                .attendance
                .parse(&card.text, AttendanceDirection::CheckOut)
                .map_err(fail),
            CardKind::Unknown => Err(ExtractError::UnknownKind),
        }
    }
}

#[async_trait]
impl CardExtractor for RegexExtractor {
    async fn extract(
        &self,
        card: &RawCard,
        target_date: NaiveDate,
    ) -> Result<ParsedEvent, ExtractError> {
        self.extract_sync(card, target_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{EventDetails, MilkType};

    fn card(kind: CardKind, text: &str) -> RawCard {
        RawCard {
            kind,
            text: text.to_string(),
        }
    }

    fn target() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 30).unwrap()
    }

    #[tokio::test]
    async fn bottle_card_gets_clock_time_on_target_date() {
        let extractor = RegexExtractor::new();
        let parsed = extractor
            .extract(
                &card(
                    CardKind::Bottle,
                    "Bottle\nRecorded by Infant C.\n11:35 AM\nBreast milk\nOunces Offered\n4\nOunces Consumed\n3.5",
                ),
                target(),
            )
            .await
            .unwrap();
        assert_eq!(parsed.timestamp, target().and_hms_opt(11, 35, 0).unwrap());
        assert_eq!(
            parsed.details,
            EventDetails::Bottle {
                milk_type: MilkType::BreastMilk,
                ounces_offered: Some(4.0),
                ounces_consumed: 3.5,
            }
        );
    }

    #[tokio::test]
    async fn nap_card_timestamp_is_the_nap_start() {
        let extractor = RegexExtractor::new();
        let parsed = extractor
            .extract(
                &card(
                    CardKind::Nap,
                    "Napping\nRecorded by Infant C.\nFrom Jan 30, 2026 1:18 PM until 1:38 PM · Back",
                ),
                target(),
            )
            .await
            .unwrap();
        assert_eq!(parsed.timestamp, target().and_hms_opt(13, 18, 0).unwrap());
    }

    #[tokio::test]
    async fn unparsable_body_reports_the_kind() {
        let extractor = RegexExtractor::new();
        let err = extractor
            .extract(&card(CardKind::Diaper, "Diaper\nall clean"), target())
            .await
            .unwrap_err();
        match err {
            ExtractError::UnparsableCard { kind, .. } => assert_eq!(kind, "diaper"),
            other => panic!("expected unparsable card, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_kind_is_its_own_error() {
        let extractor = RegexExtractor::new();
        let err = extractor
            .extract(&card(CardKind::Unknown, "Mystery\nsomething"), target())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnknownKind));
    }
}
