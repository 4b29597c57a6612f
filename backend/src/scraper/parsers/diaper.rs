//! Diaper change parser.
//!
//! The body carries the change kind as bare keywords (`Wet`, `BM`,
//! `Bowel movement`) and an optional caregiver note (`Notes: …` or a bare
//! `Very …` remark).

use regex::Regex;

use crate::domain::models::{DiaperKind, EventDetails};

#[derive(Debug)]
pub struct DiaperParser {
    wet: Regex,
    bm: Regex,
    note_labelled: Regex,
    note_bare: Regex,
}

impl DiaperParser {
    pub fn new() -> Self {
        Self {
            wet: Regex::new(r"(?i)\bwet\b").expect("wet pattern is valid"),
            bm: Regex::new(r"(?i)\b(?:bm|bowel)\b").expect("bm pattern is valid"),
            note_labelled: Regex::new(r"(?i)notes?[:\s]+([^\n]+)")
                .expect("labelled note pattern is valid"),
            note_bare: Regex::new(r"(?i)\b(very\s+\w+)").expect("bare note pattern is valid"),
        }
    }

    pub fn parse(&self, text: &str) -> Result<EventDetails, String> {
        let wet = self.wet.is_match(text);
        let bm = self.bm.is_match(text);
        let diaper_kind = match (wet, bm) {
            (true, true) => DiaperKind::Both,
            (true, false) => DiaperKind::Wet,
            (false, true) => DiaperKind::Bm,
            (false, false) => return Err("no wet/bm classification in body".to_string()),
        };

        let note = self
            .note_labelled
            .captures(text)
            .or_else(|| self.note_bare.captures(text))
            .map(|c| c[1].trim().to_string());

        Ok(EventDetails::Diaper { diaper_kind, note })
    }
}

impl Default for DiaperParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> EventDetails {
        DiaperParser::new().parse(text).unwrap()
    }

    #[test]
    fn wet_diaper() {
        assert_eq!(
            parse("Diaper\nRecorded by Infant C.\nOccurred at Jan 30, 2026 10:02 AM\nWet"),
            EventDetails::Diaper {
                diaper_kind: DiaperKind::Wet,
                note: None,
            }
        );
    }

    #[test]
    fn bm_keyword_and_bowel_spelling() {
        assert!(matches!(
            parse("Diaper\nBM"),
            EventDetails::Diaper {
                diaper_kind: DiaperKind::Bm,
                ..
            }
        ));
        assert!(matches!(
            parse("Diaper\nBowel movement"),
            EventDetails::Diaper {
                diaper_kind: DiaperKind::Bm,
                ..
            }
        ));
    }

    #[test]
    fn wet_and_bm_is_both() {
        assert!(matches!(
            parse("Diaper\nWet\nBM"),
            EventDetails::Diaper {
                diaper_kind: DiaperKind::Both,
                ..
            }
        ));
    }

    #[test]
    fn labelled_note_is_extracted() {
        assert_eq!(
            parse("Diaper\nBM\nNotes: Very watery"),
            EventDetails::Diaper {
                diaper_kind: DiaperKind::Bm,
                note: Some("Very watery".to_string()),
            }
        );
    }

    #[test]
    fn bare_very_remark_is_a_note() {
        assert_eq!(
            parse("Diaper\nWet\nVery full"),
            EventDetails::Diaper {
                diaper_kind: DiaperKind::Wet,
                note: Some("Very full".to_string()),
            }
        );
    }

    #[test]
    fn dry_diaper_is_unparsable() {
        // Not a normalized kind; surfaces as a parse-coverage warning
        assert!(DiaperParser::new().parse("Diaper\nDry").is_err());
    }

    #[test]
    fn bm_requires_word_boundary() {
        // "submarine" must not read as BM
        assert!(DiaperParser::new().parse("Diaper\nsubmarine toy").is_err());
    }
}
