//! Classroom-based card attribution.
//!
//! Cards carry no child ID; attribution hangs on the trailing
//! "Recorded by <classroom>" marker plus, for attendance cards, an explicit
//! name mention in the header. Cards that cannot be attributed are surfaced
//! as `Unresolved`/`Ambiguous` — never guessed into the wrong child.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::RawCard;
use crate::domain::models::Child;

static RECORDED_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Recorded by\s+([^·\n]+)").expect("recorded-by pattern is valid"));

/// How a card was attributed.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Child(String),
    /// Label matched no configured child
    Unresolved { label: String },
    /// Label shared by several configured children, no name disambiguated
    Ambiguous {
        label: String,
        candidates: Vec<String>,
    },
}

/// The configured classroom -> child table, fixed for the duration of a pass.
#[derive(Debug, Clone)]
pub struct ClassroomDirectory {
    children: Vec<Child>,
}

impl ClassroomDirectory {
    pub fn new(children: Vec<Child>) -> Self {
        Self { children }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    /// Extract the "Recorded by" label from a card, trailing period stripped
    pub fn recorded_by(card: &RawCard) -> Option<String> {
        RECORDED_BY
            .captures(&card.text)
            .map(|c| c[1].trim().trim_end_matches('.').to_string())
    }

    /// Attribute a card to a configured child.
    ///
    /// Resolution order: (1) a full-name mention of exactly one configured
    /// child anywhere in the card (attendance headers carry
    /// `Sign In · <Full Name>`); (2) a unique classroom-label match against
    /// the "Recorded by" marker; otherwise `Ambiguous` or `Unresolved`.
    pub fn resolve(&self, card: &RawCard) -> Resolution {
        let text_lower = card.text.to_lowercase();

        let mentioned: Vec<&Child> = self
            .children
            .iter()
            .filter(|c| text_lower.contains(&c.name.to_lowercase()))
            .collect();
        if let [child] = mentioned.as_slice() {
            debug!(child = %child.id, "attributed card by name mention");
            return Resolution::Child(child.id.clone());
        }

        let label = match Self::recorded_by(card) {
            Some(label) => label,
            None => {
                return Resolution::Unresolved {
                    label: "(no recorded-by marker)".to_string(),
                }
            }
        };

        let matches: Vec<&Child> = self
            .children
            .iter()
            .filter(|c| c.classrooms.iter().any(|room| label.contains(room.as_str())))
            .collect();

        match matches.as_slice() {
            [child] => Resolution::Child(child.id.clone()),
            [] => Resolution::Unresolved { label },
            several => Resolution::Ambiguous {
                label,
                candidates: several.iter().map(|c| c.id.clone()).collect(),
            },
        }
    }
}
