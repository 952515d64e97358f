//! Extraction of players, outcome and opening hands from a replay's event log

use crate::{Replay, PLAY_ADMIT_DEFEAT, PLAY_PICK_FIRST, PLAY_RPS};
use thiserror::Error;

/// Cards per starting hand
pub const HAND_SIZE: usize = 5;

/// Joins a hand into one table cell; card names may not contain it
pub const HAND_SEPARATOR: &str = "%%%%";

/// Why a replay cannot become a dataset row
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchIssue {
    #[error("no RPS play")]
    NoRps,
    #[error("no Pick first play")]
    MissingHands,
    #[error("Pick first reveals {0} cards, expected {expected}", expected = HAND_SIZE * 2)]
    HandSize(usize),
    #[error("revealed card without a name")]
    UnnamedCard,
    #[error("card name {0:?} contains the hand separator")]
    ForbiddenSeparator(String),
    #[error("{0} Admit defeat plays")]
    MultipleConcessions(usize),
}

/// Everything a dataset row needs from one replay, in the replay's own
/// player order
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMatch {
    pub player1: String,
    pub player2: String,
    /// Whether player1 won the coin flip; unknown when the RPS play names no winner
    pub rps_winner: Option<bool>,
    /// Whether player1 won; unknown without a concession
    pub game_winner: Option<bool>,
    pub hand_player1: Vec<String>,
    pub hand_player2: Vec<String>,
}

/// Player names from the first RPS play
pub fn players(replay: &Replay) -> Option<(String, String)> {
    let rps = replay.plays.iter().find(|p| p.kind == PLAY_RPS)?;
    Some((rps.player1.clone()?, rps.player2.clone()?))
}

/// Whether player1 won the first RPS play
pub fn rps_winner(replay: &Replay) -> Option<bool> {
    let rps = replay.plays.iter().find(|p| p.kind == PLAY_RPS)?;
    let winner = rps.winner.as_deref()?;
    Some(Some(winner) == rps.player1.as_deref())
}

/// Whether `player1` won: the player who did not admit defeat wins
pub fn game_winner(replay: &Replay, player1: &str) -> Result<Option<bool>, MatchIssue> {
    let concessions: Vec<&str> = replay
        .plays
        .iter()
        .filter(|p| p.kind == PLAY_ADMIT_DEFEAT)
        .filter_map(|p| p.username.as_deref())
        .collect();

    match concessions.as_slice() {
        [] => Ok(None),
        [admitter] => Ok(Some(*admitter != player1)),
        many => Err(MatchIssue::MultipleConcessions(many.len())),
    }
}

/// Opening hands from the first Pick first play: the first five revealed
/// cards belong to player1, the rest to player2
pub fn starting_hands(replay: &Replay) -> Result<(Vec<String>, Vec<String>), MatchIssue> {
    let pick = replay
        .plays
        .iter()
        .find(|p| p.kind == PLAY_PICK_FIRST)
        .ok_or(MatchIssue::MissingHands)?;
    let cards = pick.cards.as_deref().ok_or(MatchIssue::MissingHands)?;

    if cards.len() != HAND_SIZE * 2 {
        return Err(MatchIssue::HandSize(cards.len()));
    }

    let mut names = Vec::with_capacity(cards.len());
    for card in cards {
        let name = card.name.as_deref().ok_or(MatchIssue::UnnamedCard)?;
        if name.contains(HAND_SEPARATOR) {
            return Err(MatchIssue::ForbiddenSeparator(name.to_string()));
        }
        names.push(name.to_string());
    }

    let hand_player2 = names.split_off(HAND_SIZE);
    Ok((names, hand_player2))
}

/// Parse one replay
pub fn parse_match(replay: &Replay) -> Result<ParsedMatch, MatchIssue> {
    let (player1, player2) = players(replay).ok_or(MatchIssue::NoRps)?;
    let rps_winner = rps_winner(replay);
    let game_winner = game_winner(replay, &player1)?;
    let (hand_player1, hand_player2) = starting_hands(replay)?;

    Ok(ParsedMatch {
        player1,
        player2,
        rps_winner,
        game_winner,
        hand_player1,
        hand_player2,
    })
}

/// Join a hand into one cell
pub fn encode_hand(hand: &[String]) -> String {
    hand.join(HAND_SEPARATOR)
}

/// Split a cell back into at most [`HAND_SIZE`] card names
pub fn decode_hand(cell: &str) -> Vec<String> {
    cell.split(HAND_SEPARATOR)
        .filter(|c| !c.is_empty())
        .take(HAND_SIZE)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CardRef, Play};

    fn rps(p1: &str, p2: &str, winner: &str) -> Play {
        let mut play = Play::new(PLAY_RPS);
        play.player1 = Some(p1.to_string());
        play.player2 = Some(p2.to_string());
        play.winner = Some(winner.to_string());
        play
    }

    fn pick_first(by: &str, cards: &[&str]) -> Play {
        let mut play = Play::new(PLAY_PICK_FIRST).by(by);
        play.cards = Some(cards.iter().map(|c| CardRef::named(c)).collect());
        play
    }

    fn ten_cards() -> Vec<&'static str> {
        vec![
            "Jet Synchron",
            "R.B. Ga10 Driller",
            "Ash Blossom",
            "Scrap Recycler",
            "R.B. Funk Dock",
            "Maxx C",
            "Nibiru",
            "Droll",
            "Pot of Prosperity",
            "Called by the Grave",
        ]
    }

    #[test]
    fn test_no_rps_means_unknown_players() {
        let replay = Replay::from_plays(vec![Play::new("Normal Summon").by("alice")]);
        assert_eq!(players(&replay), None);
        assert_eq!(parse_match(&replay), Err(MatchIssue::NoRps));
    }

    #[test]
    fn test_first_rps_wins() {
        let replay = Replay::from_plays(vec![rps("alice", "bob", "bob"), rps("x", "y", "x")]);
        assert_eq!(
            players(&replay),
            Some(("alice".to_string(), "bob".to_string()))
        );
        assert_eq!(rps_winner(&replay), Some(false));
    }

    #[test]
    fn test_game_winner_from_concession() {
        let replay = Replay::from_plays(vec![
            Play::new(PLAY_ADMIT_DEFEAT),
            Play::new(PLAY_ADMIT_DEFEAT).by("bob"),
        ]);
        assert_eq!(game_winner(&replay, "alice"), Ok(Some(true)));

        let replay = Replay::from_plays(vec![Play::new(PLAY_ADMIT_DEFEAT).by("alice")]);
        assert_eq!(game_winner(&replay, "alice"), Ok(Some(false)));

        let replay = Replay::from_plays(vec![Play::new("Draw card").by("alice")]);
        assert_eq!(game_winner(&replay, "alice"), Ok(None));
    }

    #[test]
    fn test_multiple_concessions_are_malformed() {
        let replay = Replay::from_plays(vec![
            Play::new(PLAY_ADMIT_DEFEAT).by("bob"),
            Play::new(PLAY_ADMIT_DEFEAT).by("alice"),
        ]);
        assert_eq!(
            game_winner(&replay, "alice"),
            Err(MatchIssue::MultipleConcessions(2))
        );
    }

    #[test]
    fn test_first_five_cards_are_player1_regardless_of_actor() {
        let cards = ten_cards();
        for actor in ["alice", "bob"] {
            let replay = Replay::from_plays(vec![pick_first(actor, &cards)]);
            let (p1, p2) = starting_hands(&replay).unwrap();
            assert_eq!(p1, cards[..5]);
            assert_eq!(p2, cards[5..]);
        }
    }

    #[test]
    fn test_hand_size_must_be_ten() {
        let cards = ten_cards();
        let replay = Replay::from_plays(vec![pick_first("alice", &cards[..7])]);
        assert_eq!(starting_hands(&replay), Err(MatchIssue::HandSize(7)));

        let replay = Replay::from_plays(vec![Play::new("Draw card")]);
        assert_eq!(starting_hands(&replay), Err(MatchIssue::MissingHands));
    }

    #[test]
    fn test_separator_in_card_name_rejected() {
        let mut cards = ten_cards();
        cards[3] = "Evil%%%%Card";
        let replay = Replay::from_plays(vec![pick_first("alice", &cards)]);
        assert_eq!(
            starting_hands(&replay),
            Err(MatchIssue::ForbiddenSeparator("Evil%%%%Card".to_string()))
        );
    }

    #[test]
    fn test_parse_full_match() {
        let replay = Replay::from_plays(vec![
            rps("alice", "bob", "alice"),
            pick_first("alice", &ten_cards()),
            Play::new("Normal Summon").by("alice").with_card("Jet Synchron"),
            Play::new(PLAY_ADMIT_DEFEAT).by("bob"),
        ]);
        let parsed = parse_match(&replay).unwrap();
        assert_eq!(parsed.player1, "alice");
        assert_eq!(parsed.rps_winner, Some(true));
        assert_eq!(parsed.game_winner, Some(true));
        assert_eq!(parsed.hand_player1.len() + parsed.hand_player2.len(), 10);
    }

    #[test]
    fn test_hand_cell_encoding() {
        let hand: Vec<String> = ten_cards()[..5].iter().map(|s| s.to_string()).collect();
        let cell = encode_hand(&hand);
        assert_eq!(decode_hand(&cell), hand);

        // Legacy cells carry a trailing separator and may run long
        let legacy = format!("{}{}", cell, "%%%%Extra%%%%");
        assert_eq!(decode_hand(&legacy), hand);
        assert!(decode_hand("").is_empty());
    }
}
