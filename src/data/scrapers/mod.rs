//! Replay scraping
//!
//! Identifier normalization, the browser-session seam and the DuelingBook
//! replay client.

pub mod browser;
pub mod duelingbook;
pub mod links;

use crate::{Result, YgoError};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// A DuelingBook replay identifier: `[user-]duel[_matchN]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReplayId {
    pub user: Option<u64>,
    pub duel: u64,
    /// Game index within a multi-game duel
    pub index: Option<u32>,
}

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:(\d+)-)?(\d+)(?:_match(\d+))?$").expect("valid replay id pattern")
    })
}

impl ReplayId {
    /// Parse a raw id, an id with a `_matchN` suffix, or a `replay?id=` /
    /// `view-replay?id=` URL.
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        if s.is_empty() {
            return Err(YgoError::InvalidReplayId("empty identifier".to_string()));
        }

        if s.starts_with("http://") || s.starts_with("https://") {
            let url = reqwest::Url::parse(s)
                .map_err(|e| YgoError::InvalidReplayId(format!("{}: {}", s, e)))?;
            let path = url.path().trim_end_matches('/');
            if !(path.ends_with("/replay") || path.ends_with("/view-replay")) {
                return Err(YgoError::InvalidReplayId(format!(
                    "{}: not a replay URL",
                    s
                )));
            }
            let id = url
                .query_pairs()
                .find(|(k, _)| k == "id")
                .map(|(_, v)| v.into_owned())
                .ok_or_else(|| YgoError::InvalidReplayId(format!("{}: no id parameter", s)))?;
            return Self::parse_bare(&id);
        }

        Self::parse_bare(s)
    }

    fn parse_bare(s: &str) -> Result<Self> {
        let caps = id_pattern()
            .captures(s)
            .ok_or_else(|| YgoError::InvalidReplayId(s.to_string()))?;

        let number = |i: usize| -> Result<Option<u64>> {
            caps.get(i)
                .map(|m| {
                    m.as_str()
                        .parse::<u64>()
                        .map_err(|_| YgoError::InvalidReplayId(s.to_string()))
                })
                .transpose()
        };

        let user = number(1)?;
        let duel = number(2)?.ok_or_else(|| YgoError::InvalidReplayId(s.to_string()))?;
        let index = number(3)?
            .map(|n| u32::try_from(n).map_err(|_| YgoError::InvalidReplayId(s.to_string())))
            .transpose()?;

        Ok(ReplayId { user, duel, index })
    }

    /// The id the service understands (`user-duel` or `duel`)
    pub fn service_id(&self) -> String {
        match self.user {
            Some(user) => format!("{}-{}", user, self.duel),
            None => self.duel.to_string(),
        }
    }

    pub fn without_user_prefix(&self) -> Self {
        ReplayId {
            user: None,
            ..self.clone()
        }
    }

    /// Canonical replay page, used as the browser target and referer
    pub fn page_url(&self, base_url: &str) -> String {
        format!("{}/replay?id={}", base_url.trim_end_matches('/'), self.service_id())
    }

    /// Replay API endpoint
    pub fn api_url(&self, base_url: &str) -> String {
        format!(
            "{}/view-replay?id={}",
            base_url.trim_end_matches('/'),
            self.service_id()
        )
    }

    /// Stored document name
    pub fn file_name(&self) -> String {
        format!("{}.json", self)
    }
}

impl fmt::Display for ReplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.service_id())?;
        if let Some(index) = self.index {
            write!(f, "_match{}", index)?;
        }
        Ok(())
    }
}

/// A cookie captured from the browser session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
}

/// What a solved challenge hands back: a single-use token and the session's cookies
#[derive(Debug, Clone)]
pub struct SessionGrant {
    pub token: String,
    pub cookies: Vec<SessionCookie>,
}

/// Source of challenge tokens for the replay API
pub trait SessionSource {
    /// Solve the client-side challenge on the given replay page
    fn acquire(&self, replay_url: &str) -> Result<SessionGrant>;
}

impl<S: SessionSource + ?Sized> SessionSource for &S {
    fn acquire(&self, replay_url: &str) -> Result<SessionGrant> {
        (**self).acquire(replay_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw_ids() {
        let id = ReplayId::parse("745183-77512517").unwrap();
        assert_eq!(id.user, Some(745183));
        assert_eq!(id.duel, 77512517);
        assert_eq!(id.index, None);

        let id = ReplayId::parse(" 77512517 ").unwrap();
        assert_eq!(id.user, None);
        assert_eq!(id.service_id(), "77512517");
    }

    #[test]
    fn test_parse_match_suffix() {
        let id = ReplayId::parse("745183-77512517_match2").unwrap();
        assert_eq!(id.index, Some(2));
        assert_eq!(id.service_id(), "745183-77512517");
        assert_eq!(id.file_name(), "745183-77512517_match2.json");
    }

    #[test]
    fn test_parse_urls() {
        let base = "https://www.duelingbook.com";
        let a = ReplayId::parse("https://www.duelingbook.com/replay?id=745183-77512517").unwrap();
        let b =
            ReplayId::parse("https://www.duelingbook.com/view-replay?id=745183-77512517").unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.page_url(base),
            "https://www.duelingbook.com/replay?id=745183-77512517"
        );
        assert_eq!(
            a.api_url(base),
            "https://www.duelingbook.com/view-replay?id=745183-77512517"
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(ReplayId::parse("").is_err());
        assert!(ReplayId::parse("abc").is_err());
        assert!(ReplayId::parse("12-34-56").is_err());
        assert!(ReplayId::parse("https://www.duelingbook.com/deck?id=1").is_err());
        assert!(ReplayId::parse("https://www.duelingbook.com/replay").is_err());
    }

    #[test]
    fn test_strip_user_prefix() {
        let id = ReplayId::parse("745183-77512517_match1").unwrap();
        let stripped = id.without_user_prefix();
        assert_eq!(stripped.to_string(), "77512517_match1");
    }
}
