//! Fluids parser (cup drinks logged outside bottle feedings).
//!
//! The body carries an ounce amount and, sometimes, the meal it accompanied
//! (`4 oz · Lunch`).

use regex::Regex;

use crate::domain::models::EventDetails;

#[derive(Debug)]
pub struct FluidsParser {
    ounces: Regex,
    meal: Regex,
}

impl FluidsParser {
    pub fn new() -> Self {
        Self {
            ounces: Regex::new(r"(?i)([0-9]+(?:\.[0-9]+)?)\s*(?:oz\b|ounces\b)")
                .expect("ounces pattern is valid"),
            meal: Regex::new(r"(?i)\b(breakfast|lunch|dinner|am snack|pm snack|snack)\b")
                .expect("meal pattern is valid"),
        }
    }

    pub fn parse(&self, text: &str) -> Result<EventDetails, String> {
        let ounces = self
            .ounces
            .captures(text)
            .and_then(|c| c[1].parse::<f64>().ok())
            .ok_or("no ounce amount found")?;

        let meal = self.meal.captures(text).map(|c| title_case(&c[1]));

        Ok(EventDetails::Fluids { ounces, meal })
    }
}

impl Default for FluidsParser {
    fn default() -> Self {
        Self::new()
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
