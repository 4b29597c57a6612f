//! Card segmentation.
//!
//! Splits raw feed text into discrete event-card blocks. The feed carries no
//! structural markers we can trust, so the boundary heuristic is the header
//! line every card starts with: a short event label, optionally followed by
//! `· <name>`. Body lines (including the trailing "Recorded by <classroom>"
//! marker) accumulate until the next header.

use std::sync::LazyLock;

use regex::Regex;

use super::{CardKind, RawCard};

/// Event labels the portal renders but this engine does not normalize.
/// Cards under these headers pass through tagged `Unknown` so the pass can
/// surface a parse-coverage warning instead of silently dropping them.
const PASSTHROUGH_HEADERS: &[&str] = &[
    "Potty",
    "Photo",
    "Video",
    "Note",
    "Incident",
    "Medication",
    "Activity",
    "Announcement",
];

/// Navigation chrome that appears between cards in the page text.
const CHROME_LINES: &[&str] = &["Feed", "Home", "Calendar", "Chat", "Messages", "Profile"];

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    // Known labels first; the alternation keeps "Sign In"/"Sign Out" intact.
    Regex::new(
        r"^(Sign In|Sign Out|Diaper|Bottle|Fluids|Napping|Nap|Eating|Meal|Potty|Photo|Video|Note|Incident|Medication|Activity|Announcement)\b",
    )
    .expect("header pattern is valid")
});

fn classify_header(line: &str) -> Option<CardKind> {
    let label = HEADER.captures(line)?.get(1)?.as_str();
    let kind = match label {
        "Sign In" => CardKind::SignIn,
        "Sign Out" => CardKind::SignOut,
        "Diaper" => CardKind::Diaper,
        "Bottle" => CardKind::Bottle,
        "Fluids" => CardKind::Fluids,
        "Napping" | "Nap" => CardKind::Nap,
        "Eating" | "Meal" => CardKind::Meal,
        other if PASSTHROUGH_HEADERS.contains(&other) => CardKind::Unknown,
        _ => CardKind::Unknown,
    };
    Some(kind)
}

fn is_chrome(line: &str) -> bool {
    CHROME_LINES
        .iter()
        .any(|c| c.eq_ignore_ascii_case(line))
}

/// Split raw feed content into ordered event cards.
///
/// Pure function; preserves feed order (typically reverse-chronological).
/// Text before the first header and standalone navigation labels are
/// discarded.
pub fn segment_feed(raw: &str) -> Vec<RawCard> {
    let mut cards = Vec::new();
    let mut current: Option<(CardKind, Vec<&str>)> = None;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || is_chrome(line) {
            continue;
        }

        if let Some(kind) = classify_header(line) {
            if let Some((kind, lines)) = current.take() {
                cards.push(RawCard {
                    kind,
                    text: lines.join("\n"),
                });
            }
            current = Some((kind, vec![line]));
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
        // Body text before the first header is chrome; drop it.
    }

    if let Some((kind, lines)) = current {
        cards.push(RawCard {
            kind,
            text: lines.join("\n"),
        });
    }

    cards
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = "\
Feed
Home
Ezra Aschenberg
Bottle
Recorded by Infant C.
Occurred at Jan 30, 2026 11:35 AM
Breast milk
Ounces Offered
4
Ounces Consumed
3.5
Diaper
Recorded by Infant C.
Occurred at Jan 30, 2026 10:02 AM
Wet
Sign In · Ezra Aschenberg
Recorded by Sarah A.
Occurred at Jan 30, 2026 7:24 AM
Photo
Recorded by Infant C.
Occurred at Jan 30, 2026 9:15 AM";

    #[test]
    fn segments_cards_in_feed_order() {
        let cards = segment_feed(SAMPLE_FEED);
        assert_eq!(cards.len(), 4);
        assert_eq!(cards[0].kind, CardKind::Bottle);
        assert_eq!(cards[1].kind, CardKind::Diaper);
        assert_eq!(cards[2].kind, CardKind::SignIn);
        assert_eq!(cards[3].kind, CardKind::Unknown);
    }

    #[test]
    fn card_text_spans_header_through_body() {
        let cards = segment_feed(SAMPLE_FEED);
        let bottle = &cards[0];
        assert_eq!(bottle.header(), "Bottle");
        assert!(bottle.text.contains("Recorded by Infant C."));
        assert!(bottle.text.contains("Ounces Consumed"));
        assert!(!bottle.text.contains("Diaper"));
    }

    #[test]
    fn chrome_and_preamble_are_discarded() {
        let cards = segment_feed(SAMPLE_FEED);
        assert!(cards.iter().all(|c| !c.text.contains("Feed")));
        assert!(cards.iter().all(|c| !c.text.contains("Ezra Aschenberg\nBottle")));
    }

    #[test]
    fn unknown_cards_pass_through_not_dropped() {
        let cards = segment_feed("Potty · Killian Aschenberg\nRecorded by Older P.\nOccurred at Jan 30, 2026 2:00 PM");
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].kind, CardKind::Unknown);
        assert!(cards[0].text.contains("Recorded by Older P."));
    }

    #[test]
    fn empty_feed_yields_no_cards() {
        assert!(segment_feed("").is_empty());
        assert!(segment_feed("Feed\nHome\nCalendar").is_empty());
    }

    #[test]
    fn napping_and_eating_headers_classify() {
        let cards = segment_feed(
            "Napping\nRecorded by Infant C.\nFrom Jan 30, 2026 1:18 PM until 1:38 PM · Back\nEating\nRecorded by Older P.\nMeal items: chicken, rice",
        );
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].kind, CardKind::Nap);
        assert_eq!(cards[1].kind, CardKind::Meal);
    }
}
