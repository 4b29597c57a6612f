//! Meal (Eating) parser.
//!
//! The portal lists what was served after a `Meal items:` label; the meal
//! kind itself is not printed and is inferred from the hour of day.

use chrono::{NaiveDateTime, Timelike};
use regex::Regex;

use crate::domain::models::{EventDetails, MealKind};

#[derive(Debug)]
pub struct MealParser {
    items: Regex,
}

impl MealParser {
    pub fn new() -> Self {
        Self {
            items: Regex::new(r"(?i)Meal items?:\s*([^\n]+)").expect("meal items pattern is valid"),
        }
    }

    pub fn parse(&self, text: &str, timestamp: NaiveDateTime) -> Result<EventDetails, String> {
        let caps = self.items.captures(text).ok_or("no meal items line")?;
        let items: Vec<String> = caps[1]
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();
        if items.is_empty() {
            return Err("meal items line is empty".to_string());
        }

        Ok(EventDetails::Meal {
            meal_kind: MealKind::from_hour(timestamp.hour()),
            items,
        })
    }
}

impl Default for MealParser {
    fn default() -> Self {
        Self::new()
    }
}
