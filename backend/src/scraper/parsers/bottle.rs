//! Bottle feeding parser.
//!
//! Sub-patterns, tried in priority order:
//! 1. labelled `Ounces Offered X` / `Ounces Consumed Y` (the portal renders
//!    the label and the value on separate lines);
//! 2. bare `X oz` — taken as consumed, offered unknown.

use regex::Regex;

use crate::domain::models::{EventDetails, MilkType};

#[derive(Debug)]
pub struct BottleParser {
    offered: Regex,
    consumed: Regex,
    bare_ounces: Regex,
}

impl BottleParser {
    pub fn new() -> Self {
        Self {
            offered: Regex::new(r"(?is)(?:ounces\s*offered|offered)[:\s]*([0-9]+(?:\.[0-9]+)?)")
                .expect("offered pattern is valid"),
            consumed: Regex::new(r"(?is)(?:ounces\s*consumed|consumed)[:\s]*([0-9]+(?:\.[0-9]+)?)")
                .expect("consumed pattern is valid"),
            bare_ounces: Regex::new(r"(?i)([0-9]+(?:\.[0-9]+)?)\s*(?:oz\b|ounces\b)")
                .expect("bare ounces pattern is valid"),
        }
    }

    pub fn parse(&self, text: &str) -> Result<EventDetails, String> {
        let milk_type = if text.to_lowercase().contains("breast") {
            MilkType::BreastMilk
        } else if text.to_lowercase().contains("formula") {
            MilkType::Formula
        } else {
            MilkType::Unspecified
        };

        let offered = self
            .offered
            .captures(text)
            .and_then(|c| c[1].parse::<f64>().ok());
        let consumed = self
            .consumed
            .captures(text)
            .and_then(|c| c[1].parse::<f64>().ok());

        let (offered, consumed) = match (offered, consumed) {
            (offered, Some(consumed)) => (offered, consumed),
            (None, None) => {
                let bare = self
                    .bare_ounces
                    .captures(text)
                    .and_then(|c| c[1].parse::<f64>().ok())
                    .ok_or("no ounce amount found")?;
                (None, bare)
            }
            // Offered without consumed: nothing recorded as drunk yet
            (Some(offered), None) => (Some(offered), 0.0),
        };

        Ok(EventDetails::Bottle {
            milk_type,
            ounces_offered: offered,
            ounces_consumed: consumed,
        })
    }
}

impl Default for BottleParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> EventDetails {
        BottleParser::new().parse(text).unwrap()
    }

    #[test]
    fn labelled_offered_and_consumed() {
        let details = parse(
            "Bottle\nRecorded by Infant C.\nOccurred at Jan 30, 2026 11:35 AM\nBreast milk\nOunces Offered\n4\nOunces Consumed\n3.5",
        );
        assert_eq!(
            details,
            EventDetails::Bottle {
                milk_type: MilkType::BreastMilk,
                ounces_offered: Some(4.0),
                ounces_consumed: 3.5,
            }
        );
    }

    #[test]
    fn consumed_only_form() {
        let details = parse("Bottle\nBreast milk consumed 3.6oz");
        assert_eq!(
            details,
            EventDetails::Bottle {
                milk_type: MilkType::BreastMilk,
                ounces_offered: None,
                ounces_consumed: 3.6,
            }
        );
    }

    #[test]
    fn bare_ounces_fallback() {
        let details = parse("Bottle\nFormula\n5 oz.");
        assert_eq!(
            details,
            EventDetails::Bottle {
                milk_type: MilkType::Formula,
                ounces_offered: None,
                ounces_consumed: 5.0,
            }
        );
    }

    #[test]
    fn unspecified_milk_type() {
        let details = parse("Bottle\nOunces Consumed\n2.5");
        assert!(matches!(
            details,
            EventDetails::Bottle {
                milk_type: MilkType::Unspecified,
                ..
            }
        ));
    }

    #[test]
    fn no_amount_is_unparsable() {
        assert!(BottleParser::new()
            .parse("Bottle\nRecorded by Infant C.")
            .is_err());
    }
}
