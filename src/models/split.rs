//! On/off splits and lineup summaries aggregated from resolved stints.

use serde::{Deserialize, Serialize};

use super::{Lineup, PlayerId, Season, TeamId};

/// Points and possessions for one side of a split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitTotals {
    pub seconds: f64,
    pub points_for: u32,
    pub points_against: u32,
    pub possessions_for: f64,
    pub possessions_against: f64,
}

impl SplitTotals {
    pub fn offensive_rating(&self) -> Option<f64> {
        (self.possessions_for > 0.0).then(|| 100.0 * self.points_for as f64 / self.possessions_for)
    }

    pub fn defensive_rating(&self) -> Option<f64> {
        (self.possessions_against > 0.0)
            .then(|| 100.0 * self.points_against as f64 / self.possessions_against)
    }

    pub fn net_rating(&self) -> Option<f64> {
        Some(self.offensive_rating()? - self.defensive_rating()?)
    }

    pub fn plus_minus(&self) -> i64 {
        self.points_for as i64 - self.points_against as i64
    }
}

/// A player's team performance with them on and off the floor, over one
/// team's resolved stints for a season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnOffSplit {
    pub season: Season,
    pub team_id: TeamId,
    pub player_id: PlayerId,
    pub on: SplitTotals,
    pub off: SplitTotals,
    pub on_net_rtg: Option<f64>,
    pub off_net_rtg: Option<f64>,

    /// On-court net rating minus off-court net rating
    pub net_diff: Option<f64>,
}

/// Aggregate for one canonical five-player lineup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupSummary {
    pub season: Season,
    pub team_id: TeamId,
    pub lineup_key: String,
    pub lineup: Lineup,
    pub stints: u32,
    pub totals: SplitTotals,
    pub ortg: Option<f64>,
    pub drtg: Option<f64>,
    pub net_rtg: Option<f64>,
}
