//! Headless Chrome session for the replay page's reCAPTCHA challenge
//!
//! Every `acquire` launches a fresh browser and tears it down when the
//! call returns, whether or not the challenge succeeded.

use super::{SessionCookie, SessionGrant, SessionSource};
use crate::{Config, Result, YgoError};
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Browser-backed [`SessionSource`]
pub struct ChromeSession {
    home_url: String,
    site_key: String,
    ready_timeout: Duration,
    headless: bool,
    profile_dir: Option<PathBuf>,
}

impl ChromeSession {
    pub fn new(home_url: &str, site_key: &str) -> Self {
        ChromeSession {
            home_url: home_url.to_string(),
            site_key: site_key.to_string(),
            ready_timeout: Duration::from_secs(15),
            headless: true,
            profile_dir: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut session = Self::new(&config.scrape.base_url, &config.scrape.site_key)
            .headless(config.scrape.headless)
            .with_ready_timeout(Duration::from_secs(config.scrape.ready_timeout_secs));
        if let Some(dir) = &config.scrape.profile_dir {
            session = session.with_profile(dir);
        }
        session
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Reuse a persistent profile (e.g. one already logged in)
    pub fn with_profile<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.profile_dir = Some(dir.into());
        self
    }

    fn launch(&self) -> Result<Browser> {
        let options = LaunchOptions::default_builder()
            .headless(self.headless)
            .sandbox(false)
            .user_data_dir(self.profile_dir.clone())
            .args(vec![
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-blink-features=AutomationControlled"),
            ])
            .idle_browser_timeout(self.ready_timeout + Duration::from_secs(60))
            .build()
            .map_err(|e| YgoError::Browser(format!("invalid launch options: {}", e)))?;

        Browser::new(options).map_err(|e| YgoError::Browser(format!("launch failed: {}", e)))
    }

    /// Poll until the challenge script is defined or the timeout expires
    fn wait_for_challenge(&self, tab: &Tab) -> Result<()> {
        let deadline = Instant::now() + self.ready_timeout;
        loop {
            let ready = tab
                .evaluate("typeof grecaptcha !== 'undefined'", false)
                .map_err(|e| YgoError::Browser(e.to_string()))?
                .value
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if ready {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(YgoError::Browser(format!(
                    "challenge script not ready after {}s",
                    self.ready_timeout.as_secs()
                )));
            }
            std::thread::sleep(READY_POLL_INTERVAL);
        }
    }

    fn execute_challenge(&self, tab: &Tab) -> Result<String> {
        let script = format!(
            r#"new Promise(function (resolve) {{
                if (typeof grecaptcha === 'undefined') {{ resolve(null); return; }}
                grecaptcha.ready(function () {{
                    grecaptcha.execute('{}', {{action: 'submit'}})
                        .then(resolve)
                        .catch(function () {{ resolve(null); }});
                }});
            }})"#,
            self.site_key
        );

        tab.evaluate(&script, true)
            .map_err(|e| YgoError::Browser(e.to_string()))?
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| YgoError::Browser("challenge returned no token".to_string()))
    }
}

impl SessionSource for ChromeSession {
    fn acquire(&self, replay_url: &str) -> Result<SessionGrant> {
        let browser = self.launch()?;
        let tab = browser
            .new_tab()
            .map_err(|e| YgoError::Browser(e.to_string()))?;
        tab.set_default_timeout(self.ready_timeout + Duration::from_secs(15));

        // Landing on the home page first picks up the site's session cookies
        if let Err(e) = tab
            .navigate_to(&self.home_url)
            .and_then(|t| t.wait_until_navigated())
        {
            log::warn!("Could not load {}: {}", self.home_url, e);
        }

        tab.navigate_to(replay_url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| YgoError::Browser(format!("loading {}: {}", replay_url, e)))?;

        log::debug!("Waiting for reCAPTCHA on {}", replay_url);
        self.wait_for_challenge(&tab)?;
        let token = self.execute_challenge(&tab)?;

        let cookies: Vec<SessionCookie> = tab
            .get_cookies()
            .map_err(|e| YgoError::Browser(e.to_string()))?
            .into_iter()
            .map(|c| SessionCookie {
                name: c.name,
                value: c.value,
                domain: Some(c.domain),
                path: Some(c.path),
            })
            .collect();

        log::debug!(
            "Cookies: {}",
            cookies
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(SessionGrant { token, cookies })
    }
}
