//! Environment-driven configuration.
//!
//! Everything comes from `KIDPULSE_*` variables (a `.env` file is honored in
//! development). `from_env` never fails; `validate` reports every problem at
//! once so a misconfigured deploy dies with the full list instead of one
//! missing variable at a time.

use std::path::PathBuf;

use crate::domain::models::Child;

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env_var(name).unwrap_or_else(|| default.to_string())
}

fn env_flag(name: &str, default: bool) -> bool {
    match env_var(name) {
        Some(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub base_url: String,
    pub organization: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    Ollama,
    OpenAi,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub enabled: bool,
    pub provider: AiProvider,
    pub ollama_url: String,
    pub ollama_model: String,
    pub openai_api_key: String,
    pub openai_model: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub portal: PortalConfig,
    pub ai: AiConfig,
    pub children: Vec<Child>,
    pub database_url: String,
    pub bind_address: String,
    pub session_path: PathBuf,
    pub scrape_interval_minutes: u64,
    pub run_on_startup: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let provider = match env_or("KIDPULSE_AI_PROVIDER", "ollama").to_lowercase().as_str() {
            "openai" => AiProvider::OpenAi,
            _ => AiProvider::Ollama,
        };

        Self {
            portal: PortalConfig {
                base_url: env_or("KIDPULSE_PORTAL_URL", "https://app.playgroundhq.com"),
                organization: env_or("KIDPULSE_PORTAL_ORG", ""),
                email: env_or("KIDPULSE_PORTAL_EMAIL", ""),
                password: env_or("KIDPULSE_PORTAL_PASSWORD", ""),
            },
            ai: AiConfig {
                enabled: env_flag("KIDPULSE_AI_ENABLED", false),
                provider,
                ollama_url: env_or("KIDPULSE_OLLAMA_URL", "http://localhost:11434"),
                ollama_model: env_or("KIDPULSE_OLLAMA_MODEL", "llama3.2"),
                openai_api_key: env_or("KIDPULSE_OPENAI_API_KEY", ""),
                openai_model: env_or("KIDPULSE_OPENAI_MODEL", "gpt-4o-mini"),
            },
            children: parse_children(&env_or("KIDPULSE_CHILDREN", "")),
            database_url: env_or("KIDPULSE_DATABASE_URL", "sqlite:kidpulse.db"),
            bind_address: env_or("KIDPULSE_BIND", "0.0.0.0:8080"),
            session_path: PathBuf::from(env_or("KIDPULSE_SESSION_FILE", "session_state.json")),
            scrape_interval_minutes: env_or("KIDPULSE_SCRAPE_INTERVAL_MINUTES", "30")
                .parse()
                .unwrap_or(30),
            run_on_startup: env_flag("KIDPULSE_SCRAPE_ON_STARTUP", true),
        }
    }

    /// Every configuration problem, or empty when deployable
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.portal.organization.is_empty() {
            problems.push("KIDPULSE_PORTAL_ORG is not set".to_string());
        }
        if self.portal.email.is_empty() {
            problems.push("KIDPULSE_PORTAL_EMAIL is not set".to_string());
        }
        if self.portal.password.is_empty() {
            problems.push("KIDPULSE_PORTAL_PASSWORD is not set".to_string());
        }
        if self.children.is_empty() {
            problems.push(
                "KIDPULSE_CHILDREN is empty; expected 'Name=Room A|Room B;Name2=Room C'"
                    .to_string(),
            );
        }
        if self.ai.enabled
            && self.ai.provider == AiProvider::OpenAi
            && self.ai.openai_api_key.is_empty()
        {
            problems.push("KIDPULSE_OPENAI_API_KEY is required for the openai provider".to_string());
        }
        if self.scrape_interval_minutes == 0 {
            problems.push("KIDPULSE_SCRAPE_INTERVAL_MINUTES must be at least 1".to_string());
        }
        problems
    }
}

/// Parse the `Name=Room A|Room B;Name2=Room C` children table.
/// Entries without at least one classroom are skipped.
pub fn parse_children(raw: &str) -> Vec<Child> {
    raw.split(';')
        .filter_map(|entry| {
            let (name, rooms) = entry.split_once('=')?;
            let name = name.trim();
            let classrooms: Vec<String> = rooms
                .split('|')
                .map(str::trim)
                .filter(|room| !room.is_empty())
                .map(str::to_string)
                .collect();
            if name.is_empty() || classrooms.is_empty() {
                return None;
            }
            Some(Child::new(name, classrooms))
        })
        .collect()
}
