//! Derivation engine.
//!
//! Turns validated box scores and play-by-play into derived metrics:
//! - Team and player metrics from counting stats
//! - Lineup stints, on/off splits and shot zones from play-by-play
//! - Play context (assists, second chances, turnovers, transition)
//! - Rolling last-N context per team
//! - Benchmark distributions, percentile ranks and labels

pub mod assemble;
pub mod benchmark;
pub mod labels;
pub mod lineup;
pub mod metrics;
pub mod on_off;
pub mod percentile;
pub mod play_context;
pub mod rolling;
pub mod validate;
pub mod zones;

use thiserror::Error;

use crate::models::{GameId, MetricId, RecordError, Season};

/// Per-record failures. None of these abort a batch; the affected record,
/// game or lookup is dropped and reported.
#[derive(Debug, Error)]
pub enum CalcError {
    #[error(transparent)]
    InvalidRecord(#[from] RecordError),

    #[error("No benchmark for {metric} in season {season}")]
    StaleBenchmark { metric: MetricId, season: Season },

    #[error("Game {game_id} has {rows} team rows, expected 2")]
    UnpairedGame { game_id: GameId, rows: usize },

    #[error("Game {game_id} play-by-play out of order at sequence {sequence}")]
    EventOrder { game_id: GameId, sequence: u32 },
}

impl CalcError {
    /// Game the error refers to, when there is one.
    pub fn game_id(&self) -> Option<&GameId> {
        match self {
            CalcError::UnpairedGame { game_id, .. } | CalcError::EventOrder { game_id, .. } => {
                Some(game_id)
            }
            _ => None,
        }
    }
}
