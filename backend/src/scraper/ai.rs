//! Model-backed card extractor.
//!
//! An alternative [`CardExtractor`] that sends each card's text to a local
//! Ollama instance or the OpenAI chat API and asks for one JSON object back.
//! Model replies are untrusted: the JSON is fished out of whatever prose
//! surrounds it, deserialized into a loose DTO, and validated per kind before
//! anything reaches the merge layer. Every failure mode degrades to an
//! unparsable-card warning for that one card.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{AiConfig, AiProvider};
use crate::domain::models::{
    AttendanceDirection, DiaperKind, EventDetails, MealKind, MilkType, SleepPosition,
};

use super::parsers::timestamp::{find_clock_time, find_full_timestamp};
use super::{CardExtractor, CardKind, ExtractError, ParsedEvent, RawCard};

const EXTRACTION_PROMPT: &str = r#"You are an extraction engine for a childcare daily-report feed.
Given one event card, reply with exactly one JSON object and nothing else.

Fields (omit any that do not apply):
  "kind":      one of "bottle", "diaper", "nap", "fluids", "meal", "sign_in", "sign_out"
  "time":      the event time, e.g. "11:35 AM" or "Jan 30, 2026 11:35 AM"
  "milk_type": "breast_milk", "formula" or "unspecified"
  "offered":   ounces offered, number
  "consumed":  ounces consumed, number
  "diaper":    "wet", "bm" or "both"
  "note":      free-text caregiver note
  "start":     nap start time
  "end":       nap end time; omit if the child is still asleep
  "position":  "back", "side" or "stomach"
  "ounces":    fluid ounces, number
  "meal":      meal label the fluids accompanied
  "items":     array of food item strings

Card:
"#;

static JSON_BLOB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[\s\S]*\}").expect("json blob pattern is valid"));

/// Loose deserialization target for whatever the model sends back.
#[derive(Debug, Default, Deserialize)]
struct AiEvent {
    kind: Option<String>,
    time: Option<String>,
    milk_type: Option<String>,
    offered: Option<f64>,
    consumed: Option<f64>,
    diaper: Option<String>,
    note: Option<String>,
    start: Option<String>,
    end: Option<String>,
    position: Option<String>,
    ounces: Option<f64>,
    meal: Option<String>,
    items: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

pub struct AiExtractor {
    client: reqwest::Client,
    config: AiConfig,
}

impl AiExtractor {
    pub fn new(config: AiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, String> {
        match self.config.provider {
            AiProvider::Ollama => self.complete_ollama(prompt).await,
            AiProvider::OpenAi => self.complete_openai(prompt).await,
        }
    }

    async fn complete_ollama(&self, prompt: &str) -> Result<String, String> {
        let url = format!("{}/api/generate", self.config.ollama_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.config.ollama_model,
            "prompt": prompt,
            "stream": false,
        });
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("ollama request failed: {e}"))?
            .error_for_status()
            .map_err(|e| format!("ollama returned error status: {e}"))?;
        let parsed: OllamaResponse = response
            .json()
            .await
            .map_err(|e| format!("ollama reply was not the expected shape: {e}"))?;
        Ok(parsed.response)
    }

    async fn complete_openai(&self, prompt: &str) -> Result<String, String> {
        let body = serde_json::json!({
            "model": self.config.openai_model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0,
        });
        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.config.openai_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("openai request failed: {e}"))?
            .error_for_status()
            .map_err(|e| format!("openai returned error status: {e}"))?;
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| format!("openai reply was not the expected shape: {e}"))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| "openai reply had no choices".to_string())
    }
}

#[async_trait]
impl CardExtractor for AiExtractor {
    async fn extract(
        &self,
        card: &RawCard,
        target_date: NaiveDate,
    ) -> Result<ParsedEvent, ExtractError> {
        let prompt = format!("{EXTRACTION_PROMPT}{}", card.text);
        let reply = self.complete(&prompt).await.map_err(|reason| {
            warn!(kind = card.kind.as_str(), %reason, "model call failed");
            ExtractError::unparsable(card.kind, reason)
        })?;
        debug!(kind = card.kind.as_str(), "model replied, validating");
        parse_model_reply(&reply, card, target_date)
    }
}

/// Validate a raw model reply into a typed event.
///
/// Pure so the reply handling is testable without a live model. The card's
/// own kind tag is authoritative; the model's `kind` field only has to agree.
pub fn parse_model_reply(
    reply: &str,
    card: &RawCard,
    target_date: NaiveDate,
) -> Result<ParsedEvent, ExtractError> {
    let fail = |reason: String| ExtractError::unparsable(card.kind, reason);

    let blob = JSON_BLOB
        .find(reply)
        .ok_or_else(|| fail("no JSON object in model reply".to_string()))?;
    let ai: AiEvent = serde_json::from_str(blob.as_str())
        .map_err(|e| fail(format!("model reply was not valid JSON: {e}")))?;

    if let Some(kind) = &ai.kind {
        if kind != card.kind.as_str() {
            return Err(fail(format!(
                "model saw kind '{kind}' where the header says '{}'",
                card.kind.as_str()
            )));
        }
    }

    let time_of = |field: &Option<String>| -> Option<NaiveDateTime> {
        let text = field.as_deref()?;
        find_full_timestamp(text).or_else(|| find_clock_time(text).map(|t| target_date.and_time(t)))
    };

    match card.kind {
        CardKind::Bottle => {
            let consumed = ai
                .consumed
                .or(ai.ounces)
                .ok_or_else(|| fail("bottle reply without a consumed amount".to_string()))?;
            let milk_type = match ai.milk_type.as_deref() {
                Some("breast_milk") => MilkType::BreastMilk,
                Some("formula") => MilkType::Formula,
                _ => MilkType::Unspecified,
            };
            Ok(ParsedEvent {
                timestamp: time_of(&ai.time)
                    .ok_or_else(|| fail("bottle reply without a time".to_string()))?,
                details: EventDetails::Bottle {
                    milk_type,
                    ounces_offered: ai.offered,
                    ounces_consumed: consumed,
                },
            })
        }
        CardKind::Diaper => {
            let diaper_kind = match ai.diaper.as_deref() {
                Some("wet") => DiaperKind::Wet,
                Some("bm") => DiaperKind::Bm,
                Some("both") => DiaperKind::Both,
                other => {
                    return Err(fail(format!(
                        "diaper reply with unusable classification {other:?}"
                    )))
                }
            };
            Ok(ParsedEvent {
                timestamp: time_of(&ai.time)
                    .ok_or_else(|| fail("diaper reply without a time".to_string()))?,
                details: EventDetails::Diaper {
                    diaper_kind,
                    note: ai.note,
                },
            })
        }
        CardKind::Nap => {
            let start = time_of(&ai.start)
                .ok_or_else(|| fail("nap reply without a start time".to_string()))?;
            let position = match ai.position.as_deref() {
                Some("back") => SleepPosition::Back,
                Some("side") => SleepPosition::Side,
                Some("stomach") => SleepPosition::Stomach,
                _ => SleepPosition::Unknown,
            };
            Ok(ParsedEvent {
                timestamp: start,
                details: EventDetails::Nap {
                    start,
                    end: time_of(&ai.end),
                    position,
                },
            })
        }
        CardKind::Fluids => Ok(ParsedEvent {
            timestamp: time_of(&ai.time)
                .ok_or_else(|| fail("fluids reply without a time".to_string()))?,
            details: EventDetails::Fluids {
                ounces: ai
                    .ounces
                    .ok_or_else(|| fail("fluids reply without an ounce amount".to_string()))?,
                meal: ai.meal,
            },
        }),
        CardKind::Meal => {
            let timestamp = time_of(&ai.time)
                .ok_or_else(|| fail("meal reply without a time".to_string()))?;
            let items = ai
                .items
                .filter(|items| !items.is_empty())
                .ok_or_else(|| fail("meal reply without items".to_string()))?;
            Ok(ParsedEvent {
                timestamp,
                details: EventDetails::Meal {
                    meal_kind: MealKind::from_hour(chrono::Timelike::hour(&timestamp)),
                    items,
                },
            })
        }
        CardKind::SignIn | CardKind::SignOut => {
            let direction = if card.kind == CardKind::SignIn {
                AttendanceDirection::CheckIn
            } else {
                AttendanceDirection::CheckOut
            };
            Ok(ParsedEvent {
                timestamp: time_of(&ai.time)
                    .ok_or_else(|| fail("attendance reply without a time".to_string()))?,
                details: EventDetails::Attendance { direction },
            })
        }
        CardKind::Unknown => Err(ExtractError::UnknownKind),
    }
}
