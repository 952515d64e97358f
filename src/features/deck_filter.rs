//! Deck filter: keep only matches where the provider visibly played the
//! deck under study

use crate::{Replay, Result, YgoError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Deck filter settings (`[deck_filter]` in config.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckFilterConfig {
    pub enabled: bool,
    /// Player whose plays are inspected
    pub provider: Option<String>,
    /// Play kinds that count as using a card
    pub play_kinds: Vec<String>,
    /// Cards that identify the deck
    pub card_names: Vec<String>,
}

impl Default for DeckFilterConfig {
    fn default() -> Self {
        DeckFilterConfig {
            enabled: true,
            provider: None,
            play_kinds: Vec::new(),
            card_names: Vec::new(),
        }
    }
}

impl DeckFilterConfig {
    /// Enabled filter for `provider` over the given allow-lists
    pub fn targeting(provider: &str, play_kinds: &[&str], card_names: &[&str]) -> Self {
        DeckFilterConfig {
            enabled: true,
            provider: Some(provider.to_string()),
            play_kinds: play_kinds.iter().map(|s| s.to_string()).collect(),
            card_names: card_names.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Compiled deck filter
#[derive(Debug, Clone)]
pub struct DeckFilter {
    provider: String,
    play_kinds: HashSet<String>,
    card_names: HashSet<String>,
}

impl DeckFilter {
    pub fn new<I, J>(provider: &str, play_kinds: I, card_names: J) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        DeckFilter {
            provider: provider.to_string(),
            play_kinds: play_kinds.into_iter().collect(),
            card_names: card_names.into_iter().collect(),
        }
    }

    /// `None` when the filter is disabled
    pub fn from_config(config: &DeckFilterConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let provider = config.provider.as_deref().ok_or_else(|| {
            YgoError::Config(
                "deck filter needs a provider: set deck_filter.provider, pass --provider, \
                 or disable it with --no-deck-filter"
                    .to_string(),
            )
        })?;
        if config.play_kinds.is_empty() || config.card_names.is_empty() {
            return Err(YgoError::Config(
                "deck filter needs deck_filter.play_kinds and deck_filter.card_names, \
                 or disable it with --no-deck-filter"
                    .to_string(),
            ));
        }
        Ok(Some(Self::new(
            provider,
            config.play_kinds.iter().cloned(),
            config.card_names.iter().cloned(),
        )))
    }

    /// Whether the provider played a targeted card through an allowed play
    pub fn matches(&self, replay: &Replay) -> bool {
        replay.plays.iter().any(|play| {
            self.play_kinds.contains(&play.kind)
                && play
                    .card_name()
                    .map(|name| self.card_names.contains(name))
                    .unwrap_or(false)
                && play.username.as_deref() == Some(self.provider.as_str())
        })
    }

    /// Check a stored replay; a missing or unreadable document counts as off-deck
    pub fn keeps(&self, replays_dir: &Path, file: &str) -> bool {
        let path = replays_dir.join(file);
        if !path.exists() {
            log::warn!(
                "Replay {} not found, row dropped (check --replays-dir)",
                path.display()
            );
            return false;
        }
        match Replay::load(&path) {
            Ok(replay) => {
                let kept = self.matches(&replay);
                if !kept {
                    log::warn!("{} shows no deck play by {}, row dropped", file, self.provider);
                }
                kept
            }
            Err(e) => {
                log::warn!("Could not read {}: {}, row dropped", path.display(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Play;

    fn filter() -> DeckFilter {
        let config = DeckFilterConfig::targeting(
            "provider",
            &["Normal Summon", "Banish"],
            &["Jet Synchron", "R.B. Funk Dock"],
        );
        DeckFilter::from_config(&config).unwrap().unwrap()
    }

    #[test]
    fn test_provider_play_of_targeted_card_kept() {
        let replay = Replay::from_plays(vec![Play::new("Normal Summon")
            .by("provider")
            .with_card("Jet Synchron")]);
        assert!(filter().matches(&replay));
    }

    #[test]
    fn test_same_card_by_opponent_dropped() {
        let replay = Replay::from_plays(vec![Play::new("Normal Summon")
            .by("opponent")
            .with_card("Jet Synchron")]);
        assert!(!filter().matches(&replay));
    }

    #[test]
    fn test_no_allowed_play_dropped() {
        let replay = Replay::from_plays(vec![
            Play::new("Draw card").by("provider").with_card("Jet Synchron"),
            Play::new("Normal Summon").by("provider").with_card("Ash Blossom"),
            Play::new("Normal Summon").by("provider"),
        ]);
        assert!(!filter().matches(&replay));
    }

    #[test]
    fn test_disabled_and_missing_provider() {
        let mut config = DeckFilterConfig::targeting("provider", &["Banish"], &["Jet Synchron"]);
        config.enabled = false;
        assert!(DeckFilter::from_config(&config).unwrap().is_none());

        config.enabled = true;
        config.provider = None;
        assert!(matches!(
            DeckFilter::from_config(&config),
            Err(YgoError::Config(_))
        ));
    }

    #[test]
    fn test_default_lists_are_empty_and_rejected() {
        let mut config = DeckFilterConfig::default();
        assert!(config.play_kinds.is_empty());
        assert!(config.card_names.is_empty());

        config.provider = Some("provider".to_string());
        assert!(matches!(
            DeckFilter::from_config(&config),
            Err(YgoError::Config(_))
        ));
    }

    #[test]
    fn test_odd_event_elsewhere_keeps_deck_match() {
        let dir = tempfile::tempdir().unwrap();
        let doc = r#"{"plays":[
            {"play":"Chat","username":"opponent","winner":true,"cards":[1,2]},
            {"play":"Flip coin","username":"provider","card":false},
            {"play":"Normal Summon","username":"provider","card":{"name":"Jet Synchron"}}
        ]}"#;
        std::fs::write(dir.path().join("odd.json"), doc).unwrap();
        assert!(filter().keeps(dir.path(), "odd.json"));
    }

    #[test]
    fn test_missing_or_corrupt_document_is_off_deck() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        let f = filter();
        assert!(!f.keeps(dir.path(), "absent.json"));
        assert!(!f.keeps(dir.path(), "broken.json"));

        let good = Replay::from_plays(vec![Play::new("Banish")
            .by("provider")
            .with_card("R.B. Funk Dock")]);
        good.save(dir.path().join("good.json")).unwrap();
        assert!(f.keeps(dir.path(), "good.json"));
    }
}
