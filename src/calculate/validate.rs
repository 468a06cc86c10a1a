//! Pairing of validated team sides and play-by-play ordering checks.

use std::collections::BTreeMap;
use tracing::debug;

use super::CalcError;
use crate::models::{GameId, GameRecord, PlayByPlayEvent, TeamSide};

/// Pair team sides by game. Each game with exactly two sides from distinct
/// teams yields two records, one from each perspective. Anything else is
/// rejected as unpaired.
pub fn pair_team_games(sides: Vec<TeamSide>) -> (Vec<GameRecord>, Vec<CalcError>) {
    let mut by_game: BTreeMap<GameId, Vec<TeamSide>> = BTreeMap::new();
    for side in sides {
        by_game.entry(side.game_id.clone()).or_default().push(side);
    }

    let mut records = Vec::with_capacity(by_game.len() * 2);
    let mut errors = Vec::new();

    for (game_id, mut sides) in by_game {
        if sides.len() != 2 || sides[0].team_id == sides[1].team_id {
            debug!("Game {} has {} team rows", game_id, sides.len());
            errors.push(CalcError::UnpairedGame {
                game_id,
                rows: sides.len(),
            });
            continue;
        }
        sides.sort_by(|a, b| a.team_id.cmp(&b.team_id));
        let b = sides.pop();
        let a = sides.pop();
        if let (Some(a), Some(b)) = (a, b) {
            records.push(GameRecord {
                team: a.clone(),
                opponent: b.clone(),
            });
            records.push(GameRecord {
                team: b,
                opponent: a,
            });
        }
    }

    (records, errors)
}

/// Verify a game's events are strictly time-ordered: sequence strictly
/// increasing, period never decreasing, clock never increasing within a
/// period.
pub fn check_event_order(events: &[PlayByPlayEvent]) -> Result<(), CalcError> {
    for pair in events.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        let ordered = next.game_id == prev.game_id
            && next.sequence > prev.sequence
            && (next.period > prev.period
                || (next.period == prev.period && next.clock <= prev.clock));
        if !ordered {
            return Err(CalcError::EventOrder {
                game_id: next.game_id.clone(),
                sequence: next.sequence,
            });
        }
    }
    Ok(())
}

/// Group events by game, preserving input order within each game.
pub fn events_by_game(events: Vec<PlayByPlayEvent>) -> BTreeMap<GameId, Vec<PlayByPlayEvent>> {
    let mut by_game: BTreeMap<GameId, Vec<PlayByPlayEvent>> = BTreeMap::new();
    for event in events {
        by_game.entry(event.game_id.clone()).or_default().push(event);
    }
    by_game
}
