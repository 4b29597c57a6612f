//! Portal feed fetching, session handling, and retry.
//!
//! [`FeedSource`] abstracts the portal so the pipeline and its tests never
//! touch the network. [`PortalFeedSource`] is the real thing: cookie-session
//! HTTP against the parent feed pages, flattened to text for the segmenter.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fetch failure taxonomy. Auth failures and transient outages recover
/// differently, everything else in the pass never sees a raw HTTP error.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Session cookies rejected; a re-login may fix it
    #[error("portal session expired or was rejected")]
    AuthExpired,
    /// Portal unreachable or serving errors; worth a bounded retry
    #[error("feed unavailable: {0}")]
    FeedUnavailable(String),
    /// Re-login was refused outright; no retry will help
    #[error("portal rejected the stored credentials")]
    SessionInvalid,
}

/// Source of raw feed text for one date.
#[async_trait]
pub trait FeedSource: Send {
    async fn fetch_feed(&mut self, date: NaiveDate) -> Result<String, FetchError>;

    /// Establish a fresh session after [`FetchError::AuthExpired`]
    async fn reauthenticate(&mut self) -> Result<(), FetchError>;
}

/// Bounded retry for one fetch: expired auth gets a single re-login,
/// transient failures get `transient_attempts` tries with doubling backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub transient_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            transient_attempts: 3,
            initial_backoff: Duration::from_secs(2),
        }
    }
}

pub async fn fetch_with_retry(
    source: &mut dyn FeedSource,
    date: NaiveDate,
    policy: RetryPolicy,
) -> Result<String, FetchError> {
    let mut reauthed = false;
    let mut transient_failures = 0u32;
    let mut backoff = policy.initial_backoff;

    loop {
        match source.fetch_feed(date).await {
            Ok(feed) => return Ok(feed),
            Err(FetchError::AuthExpired) if !reauthed => {
                info!("session expired, re-authenticating");
                source.reauthenticate().await?;
                reauthed = true;
            }
            Err(FetchError::FeedUnavailable(reason))
                if transient_failures + 1 < policy.transient_attempts =>
            {
                transient_failures += 1;
                warn!(
                    attempt = transient_failures,
                    %reason,
                    "feed unavailable, backing off"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            Err(err) => return Err(err),
        }
    }
}

const MAX_FEED_PAGES: u32 = 8;

/// Live portal client. Holds the session cookie jar as a plain map and
/// persists it across runs so restarts skip the login round-trip.
pub struct PortalFeedSource {
    client: reqwest::Client,
    base_url: String,
    organization: String,
    email: String,
    password: String,
    session_path: PathBuf,
    cookies: HashMap<String, String>,
}

impl PortalFeedSource {
    pub fn new(
        base_url: String,
        organization: String,
        email: String,
        password: String,
        session_path: PathBuf,
    ) -> Self {
        let mut source = Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            organization,
            email,
            password,
            session_path,
            cookies: HashMap::new(),
        };
        source.load_session();
        source
    }

    fn load_session(&mut self) {
        match std::fs::read_to_string(&self.session_path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(cookies) => {
                    self.cookies = cookies;
                    debug!(path = %self.session_path.display(), "loaded saved session");
                }
                Err(e) => warn!(%e, "saved session was unreadable, starting fresh"),
            },
            Err(_) => debug!("no saved session, will authenticate on first fetch"),
        }
    }

    fn save_session(&self) {
        match serde_json::to_string_pretty(&self.cookies) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(&self.session_path, raw) {
                    warn!(%e, "could not persist session state");
                }
            }
            Err(e) => warn!(%e, "could not serialize session state"),
        }
    }

    fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn absorb_cookies(&mut self, response: &reqwest::Response) {
        for value in response.headers().get_all(reqwest::header::SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            if let Some((name, rest)) = raw.split_once('=') {
                let value = rest.split(';').next().unwrap_or("").to_string();
                self.cookies.insert(name.trim().to_string(), value);
            }
        }
    }

    async fn fetch_page(&mut self, date: NaiveDate, page: u32) -> Result<String, FetchError> {
        let url = format!(
            "{}/app/{}/parent/feed?date={}&page={}",
            self.base_url,
            self.organization,
            date.format("%Y-%m-%d"),
            page
        );
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::COOKIE, self.cookie_header())
            .send()
            .await
            .map_err(|e| FetchError::FeedUnavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(FetchError::AuthExpired);
        }
        if status.is_server_error() {
            return Err(FetchError::FeedUnavailable(format!(
                "portal returned {status}"
            )));
        }
        // The portal answers expired sessions with a redirect to its login
        // page rather than a 401
        if response.url().path().contains("signin") {
            return Err(FetchError::AuthExpired);
        }

        self.absorb_cookies(&response);
        let html = response
            .text()
            .await
            .map_err(|e| FetchError::FeedUnavailable(format!("body read failed: {e}")))?;
        Ok(strip_tags(&html))
    }

    async fn login(&mut self) -> Result<(), FetchError> {
        let url = format!("{}/signin", self.base_url);
        let form = [
            ("email", self.email.as_str()),
            ("password", self.password.as_str()),
        ];
        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| FetchError::FeedUnavailable(format!("login request failed: {e}")))?;

        if !response.status().is_success() && !response.status().is_redirection() {
            return Err(FetchError::SessionInvalid);
        }
        self.cookies.clear();
        self.absorb_cookies(&response);
        if self.cookies.is_empty() {
            return Err(FetchError::SessionInvalid);
        }
        self.save_session();
        info!("portal login succeeded");
        Ok(())
    }
}

#[async_trait]
impl FeedSource for PortalFeedSource {
    /// Fetch every feed page for `date` and return the concatenated text.
    ///
    /// Pagination stops at the first page with no "Recorded by" marker
    /// (the portal pads trailing pages with chrome only) or at a hard cap.
    async fn fetch_feed(&mut self, date: NaiveDate) -> Result<String, FetchError> {
        if self.cookies.is_empty() {
            self.login().await?;
        }

        let mut feed = String::new();
        for page in 1..=MAX_FEED_PAGES {
            let text = self.fetch_page(date, page).await?;
            if !text.contains("Recorded by") {
                debug!(page, "no event cards on page, stopping pagination");
                break;
            }
            feed.push_str(&text);
            feed.push('\n');
        }
        self.save_session();
        Ok(feed)
    }

    async fn reauthenticate(&mut self) -> Result<(), FetchError> {
        self.cookies.clear();
        self.login().await
    }
}

/// Flatten feed HTML to the line-oriented text the segmenter expects.
/// Script and style bodies are dropped, every other tag becomes a line break.
pub fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len() / 2);
    let mut chars = html.char_indices().peekable();
    let mut skip_until: Option<&str> = None;

    while let Some((i, c)) = chars.next() {
        if let Some(closer) = skip_until {
            let matches_closer = html[i..]
                .get(..closer.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(closer));
            if matches_closer {
                for _ in 0..closer.len() - 1 {
                    chars.next();
                }
                skip_until = None;
            }
            continue;
        }
        if c == '<' {
            let rest = &html[i..];
            if rest.get(..7).is_some_and(|h| h.eq_ignore_ascii_case("<script")) {
                skip_until = Some("</script>");
            } else if rest.get(..6).is_some_and(|h| h.eq_ignore_ascii_case("<style")) {
                skip_until = Some("</style>");
            }
            // consume to the closing '>'
            for (_, tc) in chars.by_ref() {
                if tc == '>' {
                    break;
                }
            }
            text.push('\n');
        } else {
            text.push(c);
        }
    }

    let decoded = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&#39;", "'")
        .replace("&quot;", "\"");

    decoded
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
