use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;
use tracing::{error, info};

mod config;
mod domain;
mod notify;
mod rest;
mod scheduler;
mod scraper;
mod storage;

use config::{AiProvider, Config};
use domain::ScrapeService;
use notify::LogNotifier;
use scraper::ai::AiExtractor;
use scraper::fetcher::{FeedSource, PortalFeedSource, RetryPolicy};
use scraper::parsers::RegexExtractor;
use scraper::{CardExtractor, ClassroomDirectory};
use storage::SqliteStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    let config = Config::from_env();
    let problems = config.validate();
    if !problems.is_empty() {
        for problem in &problems {
            error!("{problem}");
        }
        anyhow::bail!("configuration is incomplete ({} problems)", problems.len());
    }

    info!(
        children = config.children.len(),
        ai = config.ai.enabled,
        "starting kidpulse"
    );

    let store = Arc::new(
        SqliteStore::connect(&config.database_url)
            .await
            .context("opening database")?,
    );

    let extractor: Arc<dyn CardExtractor> = if config.ai.enabled {
        let provider = match config.ai.provider {
            AiProvider::Ollama => "ollama",
            AiProvider::OpenAi => "openai",
        };
        info!(provider, "card extraction via model");
        Arc::new(AiExtractor::new(config.ai.clone()))
    } else {
        Arc::new(RegexExtractor::new())
    };

    let session: Arc<Mutex<Box<dyn FeedSource>>> =
        Arc::new(Mutex::new(Box::new(PortalFeedSource::new(
            config.portal.base_url.clone(),
            config.portal.organization.clone(),
            config.portal.email.clone(),
            config.portal.password.clone(),
            config.session_path.clone(),
        ))));

    let service = Arc::new(ScrapeService::new(
        session,
        ClassroomDirectory::new(config.children.clone()),
        extractor,
        store.clone(),
        store.clone(),
        Arc::new(LogNotifier),
        RetryPolicy::default(),
    ));

    let scheduler = scheduler::Scheduler::new(
        service.clone(),
        config.scrape_interval_minutes,
        config.run_on_startup,
    );
    tokio::spawn(scheduler.run());

    let app = rest::router(rest::AppState {
        service,
        records: store.clone(),
        log: store,
        ai_parsing_enabled: config.ai.enabled,
        scrape_interval_minutes: config.scrape_interval_minutes,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("binding {}", config.bind_address))?;
    info!(addr = %config.bind_address, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
