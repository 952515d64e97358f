//! Per-match dataset table
//!
//! One row per parsed replay, re-oriented so the data provider is always
//! player1, stored as CSV between pipeline stages.

use crate::features::match_parser::{self, decode_hand, encode_hand, MatchIssue};
use crate::{Replay, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One dataset row
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    /// Source document name
    pub file: String,
    pub player1: String,
    pub player2: String,
    /// Whether player1 won the coin flip
    pub rps_winner: Option<bool>,
    /// Whether player1 won the game
    pub game_winner: Option<bool>,
    pub hand_player1: Vec<String>,
    pub hand_player2: Vec<String>,
}

impl DatasetRow {
    pub fn from_parsed(file: &str, parsed: match_parser::ParsedMatch) -> Self {
        DatasetRow {
            file: file.to_string(),
            player1: parsed.player1,
            player2: parsed.player2,
            rps_winner: parsed.rps_winner,
            game_winner: parsed.game_winner,
            hand_player1: parsed.hand_player1,
            hand_player2: parsed.hand_player2,
        }
    }

    /// Put `provider` in the player1 seat, flipping the player1-relative
    /// outcomes with it. Rows already oriented, or without the provider,
    /// come back unchanged.
    pub fn oriented_to(self, provider: &str) -> Self {
        if self.player2 != provider || self.player1 == provider {
            return self;
        }
        DatasetRow {
            file: self.file,
            player1: self.player2,
            player2: self.player1,
            rps_winner: self.rps_winner.map(|w| !w),
            game_winner: self.game_winner.map(|w| !w),
            hand_player1: self.hand_player2,
            hand_player2: self.hand_player1,
        }
    }
}

/// CSV shape of a row
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(default)]
    file: String,
    #[serde(default)]
    player1: String,
    #[serde(default)]
    player2: String,
    #[serde(default)]
    rps_winner: String,
    #[serde(default)]
    game1_winner: String,
    #[serde(default)]
    starting_hand_player1: String,
    #[serde(default)]
    starting_hand_player2: String,
}

impl From<&DatasetRow> for CsvRow {
    fn from(row: &DatasetRow) -> Self {
        CsvRow {
            file: row.file.clone(),
            player1: row.player1.clone(),
            player2: row.player2.clone(),
            rps_winner: bool_cell(row.rps_winner),
            game1_winner: bool_cell(row.game_winner),
            starting_hand_player1: encode_hand(&row.hand_player1),
            starting_hand_player2: encode_hand(&row.hand_player2),
        }
    }
}

impl From<CsvRow> for DatasetRow {
    fn from(row: CsvRow) -> Self {
        DatasetRow {
            file: row.file.trim().to_string(),
            player1: row.player1,
            player2: row.player2,
            rps_winner: parse_bool_cell(&row.rps_winner),
            game_winner: parse_bool_cell(&row.game1_winner),
            hand_player1: decode_hand(&row.starting_hand_player1),
            hand_player2: decode_hand(&row.starting_hand_player2),
        }
    }
}

fn bool_cell(value: Option<bool>) -> String {
    match value {
        Some(true) => "true".to_string(),
        Some(false) => "false".to_string(),
        None => String::new(),
    }
}

/// Lenient boolean coercion; anything unrecognized is unknown
pub fn parse_bool_cell(cell: &str) -> Option<bool> {
    match cell.trim().to_lowercase().as_str() {
        "true" | "1" | "1.0" | "yes" => Some(true),
        "false" | "0" | "0.0" | "no" => Some(false),
        _ => None,
    }
}

/// Write the dataset table
pub fn write_csv<P: AsRef<Path>>(rows: &[DatasetRow], path: P) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for row in rows {
        writer.serialize(CsvRow::from(row))?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a dataset table written by [`write_csv`]
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Vec<DatasetRow>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let mut rows = Vec::new();
    for record in reader.deserialize::<CsvRow>() {
        rows.push(DatasetRow::from(record?));
    }
    Ok(rows)
}

/// Result of scanning a replay directory
#[derive(Debug, Default)]
pub struct DatasetBuild {
    pub rows: Vec<DatasetRow>,
    /// Documents left out, with the reason
    pub skipped: Vec<(String, String)>,
    /// Distinct play kinds, in first-seen order
    pub play_kinds: Vec<String>,
}

/// Builds the dataset table from a directory of replay documents
pub struct DatasetBuilder {
    provider: Option<String>,
}

impl DatasetBuilder {
    pub fn new(provider: Option<&str>) -> Self {
        DatasetBuilder {
            provider: provider.map(str::to_string),
        }
    }

    /// Replay documents in the directory, sorted by name
    pub fn replay_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.is_file() && path.extension().map(|e| e == "json").unwrap_or(false) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Turn one replay into a row
    pub fn row_for(&self, file: &str, replay: &Replay) -> std::result::Result<DatasetRow, MatchIssue> {
        let parsed = match_parser::parse_match(replay)?;
        let row = DatasetRow::from_parsed(file, parsed);
        Ok(match &self.provider {
            Some(provider) => row.oriented_to(provider),
            None => row,
        })
    }

    /// Scan a directory; unusable documents are logged and skipped
    pub fn build_from_dir<P: AsRef<Path>>(&self, dir: P) -> Result<DatasetBuild> {
        let mut build = DatasetBuild::default();

        for path in Self::replay_files(dir.as_ref())? {
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let replay = match Replay::load(&path) {
                Ok(replay) => replay,
                Err(e) => {
                    log::warn!("Could not read {}: {} - skipped", file, e);
                    build.skipped.push((file, e.to_string()));
                    continue;
                }
            };

            for play in &replay.plays {
                if !build.play_kinds.contains(&play.kind) {
                    build.play_kinds.push(play.kind.clone());
                }
            }

            match self.row_for(&file, &replay) {
                Ok(row) => build.rows.push(row),
                Err(issue) => {
                    log::warn!("{} in {} - skipped", issue, file);
                    build.skipped.push((file, issue.to_string()));
                }
            }
        }

        log::info!("Plays seen (unique): {:?}", build.play_kinds);
        log::info!(
            "Built {} rows, skipped {} documents",
            build.rows.len(),
            build.skipped.len()
        );
        Ok(build)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand(prefix: &str) -> Vec<String> {
        (1..=5).map(|i| format!("{} {}", prefix, i)).collect()
    }

    fn row(player1: &str, player2: &str) -> DatasetRow {
        DatasetRow {
            file: "1.json".to_string(),
            player1: player1.to_string(),
            player2: player2.to_string(),
            rps_winner: Some(true),
            game_winner: Some(false),
            hand_player1: hand("A"),
            hand_player2: hand("B"),
        }
    }

    #[test]
    fn test_orientation_swaps_everything() {
        let oriented = row("opponent", "provider").oriented_to("provider");
        assert_eq!(oriented.player1, "provider");
        assert_eq!(oriented.player2, "opponent");
        assert_eq!(oriented.rps_winner, Some(false));
        assert_eq!(oriented.game_winner, Some(true));
        assert_eq!(oriented.hand_player1, hand("B"));
        assert_eq!(oriented.hand_player2, hand("A"));
    }

    #[test]
    fn test_orientation_idempotent() {
        let once = row("opponent", "provider").oriented_to("provider");
        let twice = once.clone().oriented_to("provider");
        assert_eq!(once, twice);

        let untouched = row("x", "y");
        assert_eq!(untouched.clone().oriented_to("provider"), untouched);
    }

    #[test]
    fn test_csv_roundtrip_keeps_unknowns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matches.csv");

        let mut undecided = row("a", "b");
        undecided.game_winner = None;
        let rows = vec![row("a", "b"), undecided];

        write_csv(&rows, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(
            "file,player1,player2,rps_winner,game1_winner,starting_hand_player1,starting_hand_player2"
        ));
        assert_eq!(read_csv(&path).unwrap(), rows);
    }

    const MATCH_PLAYS: &str = r#"
        {"play":"RPS","player1":"opponent","player2":"provider","winner":"provider"},
        {"play":"Pick first","username":"provider","cards":[
            {"name":"A1"},{"name":"A2"},{"name":"A3"},{"name":"A4"},{"name":"A5"},
            {"name":"B1"},{"name":"B2"},{"name":"B3"},{"name":"B4"},{"name":"B5"}]},
        {"play":"Admit defeat","username":"opponent"}"#;

    #[test]
    fn test_odd_events_do_not_make_a_match_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let odd_events = [
            r#"{"play":"Chat","username":"opponent","winner":true}"#,
            r#"{"play":"Flip coin","username":"provider","card":false}"#,
            r#"{"play":"Reveal","username":"provider","cards":[1,2]}"#,
        ];
        for (i, odd) in odd_events.iter().enumerate() {
            let doc = format!(r#"{{"plays":[{},{}]}}"#, MATCH_PLAYS, odd);
            std::fs::write(dir.path().join(format!("{}-odd.json", i)), doc).unwrap();
        }
        std::fs::write(dir.path().join("9-corrupt.json"), "{\"plays\": [").unwrap();

        let build = DatasetBuilder::new(Some("provider"))
            .build_from_dir(dir.path())
            .unwrap();

        let files: Vec<&str> = build.rows.iter().map(|r| r.file.as_str()).collect();
        assert_eq!(files, vec!["0-odd.json", "1-odd.json", "2-odd.json"]);
        for row in &build.rows {
            assert_eq!(row.player1, "provider");
            assert_eq!(row.rps_winner, Some(true));
            assert_eq!(row.game_winner, Some(true));
            assert_eq!(row.hand_player1, vec!["B1", "B2", "B3", "B4", "B5"]);
        }
        assert_eq!(build.skipped.len(), 1);
        assert_eq!(build.skipped[0].0, "9-corrupt.json");
        assert!(build.play_kinds.contains(&"Flip coin".to_string()));
    }

    #[test]
    fn test_bool_coercion() {
        assert_eq!(parse_bool_cell("True"), Some(true));
        assert_eq!(parse_bool_cell(" false "), Some(false));
        assert_eq!(parse_bool_cell("1.0"), Some(true));
        assert_eq!(parse_bool_cell(""), None);
        assert_eq!(parse_bool_cell("draw"), None);
    }
}
