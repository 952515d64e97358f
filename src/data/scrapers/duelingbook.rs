//! DuelingBook replay client
//!
//! Posts a challenge token, together with the browser session's cookies, to
//! the replay API and decodes the match document.

use super::{ReplayId, SessionCookie, SessionSource};
use crate::{Config, Replay, Result, YgoError};
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, ORIGIN, REFERER};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Tokens shorter than this are not real challenge responses
const MIN_TOKEN_LEN: usize = 50;

/// Fetches replay documents through a [`SessionSource`]
pub struct ReplayFetcher<S: SessionSource> {
    session: S,
    base_url: String,
    user_agent: String,
    request_timeout: Duration,
}

impl<S: SessionSource> ReplayFetcher<S> {
    pub fn new(session: S, base_url: &str) -> Self {
        ReplayFetcher {
            session,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: crate::ScrapeConfig::default().user_agent,
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(session: S, config: &Config) -> Self {
        Self::new(session, &config.scrape.base_url)
            .with_user_agent(&config.scrape.user_agent)
            .with_timeout(Duration::from_secs(config.scrape.request_timeout_secs))
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Fetch one replay document
    pub fn fetch(&self, id: &ReplayId) -> Result<Replay> {
        let page_url = id.page_url(&self.base_url);
        let api_url = id.api_url(&self.base_url);

        log::info!("Fetching replay {}", id);
        let grant = self.session.acquire(&page_url)?;
        if grant.token.len() < MIN_TOKEN_LEN {
            return Err(YgoError::Browser(format!(
                "challenge token too short ({} chars)",
                grant.token.len()
            )));
        }
        log::debug!(
            "Token acquired ({} chars), {} cookies",
            grant.token.len(),
            grant.cookies.len()
        );

        let jar = cookie_jar(&grant.cookies, &self.base_url);
        let client = reqwest::blocking::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.request_timeout)
            .cookie_provider(Arc::new(jar))
            .build()?;

        let response = client
            .post(&api_url)
            .header(ACCEPT, "application/json")
            .header(ORIGIN, &self.base_url)
            .header(REFERER, &page_url)
            .form(&[
                ("token", grant.token.as_str()),
                ("recaptcha_version", "3"),
                ("master", "2"),
            ])
            .send()?
            .error_for_status()?;

        let body = response.text()?;
        parse_response(&body)
    }

    /// Fetch and store one replay, returning the written path
    pub fn fetch_to_dir(&self, id: &ReplayId, out_dir: &Path) -> Result<PathBuf> {
        let replay = self.fetch(id)?;
        let path = out_dir.join(id.file_name());
        replay.save(&path)?;
        log::info!("Saved {}", path.display());
        Ok(path)
    }

    /// Fetch every identifier in order; one failure never stops the batch
    pub fn fetch_all(
        &self,
        inputs: &[String],
        out_dir: &Path,
        strip_user_prefix: bool,
    ) -> ScrapeSummary {
        let mut summary = ScrapeSummary::default();

        for input in inputs {
            let result = ReplayId::parse(input).and_then(|id| {
                let id = if strip_user_prefix {
                    id.without_user_prefix()
                } else {
                    id
                };
                self.fetch_to_dir(&id, out_dir)
            });

            match result {
                Ok(path) => summary.saved.push(path),
                Err(e) => {
                    if matches!(e, YgoError::LoginRequired { .. }) {
                        log::warn!(
                            "{} needs a logged-in session; pass --profile-dir with a logged-in browser profile",
                            input
                        );
                    }
                    log::warn!("Failed to fetch {}: {}", input, e);
                    summary.failures.push((input.clone(), e.to_string()));
                }
            }
        }

        summary
    }
}

/// Outcome of a batch scrape
#[derive(Debug, Default)]
pub struct ScrapeSummary {
    pub saved: Vec<PathBuf>,
    pub failures: Vec<(String, String)>,
}

impl ScrapeSummary {
    pub fn attempted(&self) -> usize {
        self.saved.len() + self.failures.len()
    }

    /// Whether the run counts as failed; `allow_partial` tolerates failures
    /// as long as something was saved
    pub fn is_failure(&self, allow_partial: bool) -> bool {
        if allow_partial {
            self.saved.is_empty() && !self.failures.is_empty()
        } else {
            !self.failures.is_empty()
        }
    }
}

/// Install browser cookies into a jar scoped to their original domain/path
pub fn cookie_jar(cookies: &[SessionCookie], base_url: &str) -> Jar {
    let jar = Jar::default();
    let default_host = reqwest::Url::parse(base_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "www.duelingbook.com".to_string());

    for cookie in cookies {
        if cookie.name.is_empty() {
            continue;
        }
        let domain = cookie
            .domain
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(&default_host);
        let path = cookie
            .path
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or("/");

        let url = match reqwest::Url::parse(&format!(
            "https://{}{}",
            domain.trim_start_matches('.'),
            path
        )) {
            Ok(url) => url,
            Err(e) => {
                log::debug!("Skipping cookie {} for {}: {}", cookie.name, domain, e);
                continue;
            }
        };

        jar.add_cookie_str(
            &format!(
                "{}={}; Domain={}; Path={}",
                cookie.name, cookie.value, domain, path
            ),
            &url,
        );
    }

    jar
}

/// Decode an API response body, surfacing the service's error envelope
pub fn parse_response(body: &str) -> Result<Replay> {
    let value: serde_json::Value = serde_json::from_str(body)?;

    if value.get("action").and_then(|a| a.as_str()) == Some("Error") {
        let message = value
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error")
            .to_string();
        if message.to_lowercase().contains("logged in") {
            return Err(YgoError::LoginRequired { message });
        }
        return Err(YgoError::Service { message });
    }

    Ok(serde_json::from_value(value)?)
}
