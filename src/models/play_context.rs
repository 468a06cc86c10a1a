//! Play-by-play context for a team-game: shot creation, second chances,
//! points off turnovers and transition scoring.

use serde::{Deserialize, Serialize};

use super::{GameId, Season, TeamId};

/// Field goals for one kind of play.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShotSplit {
    pub fga: u32,
    pub fgm: u32,
    pub fg3m: u32,
    pub points: u32,
}

impl ShotSplit {
    pub fn record(&mut self, made: bool, three: bool) {
        self.fga += 1;
        if made {
            self.fgm += 1;
            self.points += if three { 3 } else { 2 };
            if three {
                self.fg3m += 1;
            }
        }
    }

    pub fn efg_pct(&self) -> Option<f64> {
        (self.fga > 0).then(|| (self.fgm as f64 + 0.5 * self.fg3m as f64) / self.fga as f64)
    }

    pub fn points_per_shot(&self) -> Option<f64> {
        (self.fga > 0).then(|| self.points as f64 / self.fga as f64)
    }
}

/// One team's play-by-play context in one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayContext {
    pub season: Season,
    pub game_id: GameId,
    pub team_id: TeamId,

    pub fgm: u32,
    pub assisted_fgm: u32,
    pub unassisted_fgm: u32,

    /// `None` without a made field goal
    pub assisted_rate: Option<f64>,

    pub offensive_rebounds: u32,

    /// Points scored on possessions extended by an offensive rebound
    pub second_chance_points: u32,
    pub second_chance_per_rebound: Option<f64>,

    pub opponent_turnovers: u32,

    /// Points scored on possessions started by an opponent turnover
    pub points_off_turnovers: u32,
    pub points_per_turnover: Option<f64>,

    pub transition: ShotSplit,
    pub halfcourt: ShotSplit,
    pub transition_efg_pct: Option<f64>,
    pub halfcourt_efg_pct: Option<f64>,
}
