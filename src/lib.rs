//! Yu-Gi-Oh! replay analytics
//!
//! Scrapes DuelingBook replays, turns them into a per-match dataset, derives
//! starting-hand features and benchmarks standard classifiers on predicting
//! the data provider's game outcome.

pub mod data;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod training;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Event kind carrying the two player names and the coin-flip winner
pub const PLAY_RPS: &str = "RPS";
/// Event kind carrying the revealed opening hands
pub const PLAY_PICK_FIRST: &str = "Pick first";
/// Event kind recorded when a player concedes
pub const PLAY_ADMIT_DEFEAT: &str = "Admit defeat";

/// Event-kind-specific field: a value of some other shape reads as absent
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// A card reference attached to a play or listed in a revealed hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRef {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CardRef {
    pub fn named(name: &str) -> Self {
        CardRef {
            name: Some(name.to_string()),
            extra: serde_json::Map::new(),
        }
    }
}

/// One entry of a replay's event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Play {
    /// Free-form event label ("Normal Summon", "RPS", "Pick first", ...)
    #[serde(rename = "play", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub card: Option<CardRef>,
    // RPS fields
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub player1: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub player2: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    // Pick first fields
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<CardRef>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Play {
    /// Bare event of the given kind, mostly for building fixtures
    pub fn new(kind: &str) -> Self {
        Play {
            kind: kind.to_string(),
            username: None,
            card: None,
            player1: None,
            player2: None,
            winner: None,
            cards: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn by(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    pub fn with_card(mut self, name: &str) -> Self {
        self.card = Some(CardRef::named(name));
        self
    }

    pub fn card_name(&self) -> Option<&str> {
        self.card.as_ref().and_then(|c| c.name.as_deref())
    }
}

/// A scraped replay document, as returned by the replay API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replay {
    #[serde(default)]
    pub plays: Vec<Play>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Replay {
    pub fn from_plays(plays: Vec<Play>) -> Self {
        Replay {
            plays,
            extra: serde_json::Map::new(),
        }
    }

    /// Read a stored replay document
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the document pretty-printed
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path.as_ref(), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Output format for reports
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum YgoError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Browser session failed: {0}")]
    Browser(String),

    #[error("Replay service error: {message}")]
    Service { message: String },

    #[error("Replay requires a logged-in session ({message}); use a browser profile that is logged in")]
    LoginRequired { message: String },

    #[error("Invalid replay identifier: {0}")]
    InvalidReplayId(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, YgoError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub deck_filter: features::DeckFilterConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub bench: BenchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub base_url: String,
    pub site_key: String,
    pub user_agent: String,
    /// Seconds to wait for the challenge script to load
    pub ready_timeout_secs: u64,
    /// Seconds before the replay API request is abandoned
    pub request_timeout_secs: u64,
    pub headless: bool,
    /// Persistent browser profile, for replays that need a logged-in session
    pub profile_dir: Option<String>,
    /// Drop the "user-" prefix from "user-duel" identifiers
    pub strip_user_prefix: bool,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        ScrapeConfig {
            base_url: "https://www.duelingbook.com".to_string(),
            site_key: "6LcjdkEgAAAAAKoEsPnPbSdjLkf4bLx68445txKj".to_string(),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            ready_timeout_secs: 15,
            request_timeout_secs: 30,
            headless: true,
            profile_dir: None,
            strip_user_prefix: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub replays_dir: String,
    pub matches_csv: String,
    pub features_csv: String,
    pub target_csv: String,
    pub scores_json: Option<String>,
    /// Player canonicalized into player1
    pub provider: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            replays_dir: "data/db_replays".to_string(),
            matches_csv: "data/matches.csv".to_string(),
            features_csv: "data/features.csv".to_string(),
            target_csv: "data/target.csv".to_string(),
            scores_json: None,
            provider: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Keep the provider's coin-flip result as a feature column
    pub include_coin_flip: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            include_coin_flip: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub test_size: f64,
    pub random_state: u64,
    pub knn_neighbors: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            test_size: 0.2,
            random_state: 1,
            knn_neighbors: 11,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            YgoError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| YgoError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| YgoError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Point every provider-dependent stage at the same player
    pub fn set_provider(&mut self, provider: &str) {
        self.data.provider = Some(provider.to_string());
        self.deck_filter.provider = Some(provider.to_string());
    }
}
