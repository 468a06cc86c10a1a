//! Assembled output rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{
    GameContext, GameId, MetricId, MetricSet, PlayerId, PlayerRole, PositionGroup, RecordKey,
    Season, TeamId, Tier, UsageBasis, WinDriver,
};

/// Result of ranking one metric value against its benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RankOutcome {
    Ranked {
        raw: f64,
        /// Position of `raw` in the distribution, ascending by value
        raw_percentile: f64,
        /// Percentile oriented so higher is better; drives the tier
        percentile: f64,
        tier: Tier,
    },
    /// The metric value itself is missing
    Missing,
    /// No distribution exists for the season/metric
    NoBenchmark,
}

impl RankOutcome {
    pub fn percentile(&self) -> Option<f64> {
        match self {
            RankOutcome::Ranked { percentile, .. } => Some(*percentile),
            _ => None,
        }
    }

    pub fn tier(&self) -> Option<Tier> {
        match self {
            RankOutcome::Ranked { tier, .. } => Some(*tier),
            _ => None,
        }
    }
}

/// One assembled team-game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamGameRow {
    pub record_key: RecordKey,
    pub season: Season,
    pub game_id: GameId,
    pub game_date: NaiveDate,
    pub team_id: TeamId,
    pub team_name: Option<String>,
    pub opponent_id: TeamId,
    pub home: Option<bool>,
    pub points: u32,
    pub opponent_points: u32,
    pub margin: i64,
    pub won: bool,

    pub metrics: MetricSet,

    /// Last-N context over strictly prior games
    pub rolling: MetricSet,

    /// Prior games that fed the rolling window
    pub rolling_games: u32,

    pub ranks: BTreeMap<MetricId, RankOutcome>,

    /// Display color of each ranked metric's tier
    pub tier_colors: BTreeMap<MetricId, String>,

    pub game_context: GameContext,

    /// Empty for the losing side
    pub why_won: Vec<WinDriver>,

    pub benchmark_version: u64,
}

/// One assembled player-game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerGameRow {
    pub record_key: RecordKey,
    pub season: Season,
    pub game_id: GameId,
    pub team_id: TeamId,
    pub player_id: PlayerId,
    pub player_name: Option<String>,
    pub position: PositionGroup,
    pub starter: bool,
    pub minutes: f64,

    /// Played under five minutes
    pub dnq: bool,

    /// `None` when no usage value could be computed
    pub usage_basis: Option<UsageBasis>,

    pub metrics: MetricSet,
    pub ranks: BTreeMap<MetricId, RankOutcome>,
    pub tier_colors: BTreeMap<MetricId, String>,
    pub role: Option<PlayerRole>,
    pub role_color: Option<String>,
    pub benchmark_version: u64,
}

/// What kind of input a rejection refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectedKind {
    TeamGame,
    PlayerGame,
    PlayByPlay,
}

/// A record (or a game's play-by-play) dropped during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub season: Season,
    pub kind: RejectedKind,
    pub record: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_outcome_serialization() {
        let ranked = RankOutcome::Ranked {
            raw: 0.55,
            raw_percentile: 80.0,
            percentile: 80.0,
            tier: Tier::Great,
        };
        let json = serde_json::to_string(&ranked).unwrap();
        assert!(json.contains(r#""status":"ranked""#));
        assert!(json.contains(r#""tier":"great""#));
        assert_eq!(ranked.percentile(), Some(80.0));

        let json = serde_json::to_string(&RankOutcome::NoBenchmark).unwrap();
        assert_eq!(json, r#"{"status":"no_benchmark"}"#);
        assert_eq!(RankOutcome::Missing.tier(), None);
    }
}
