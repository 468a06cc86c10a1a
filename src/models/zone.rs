//! Shooting zones.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{GameId, Season, TeamId};

/// Court zone a field-goal attempt is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    AtRim,
    Paint,
    Midrange,
    CornerThree,
    AboveBreakThree,
    Unclassified,
}

impl Zone {
    pub const ALL: [Zone; 6] = [
        Zone::AtRim,
        Zone::Paint,
        Zone::Midrange,
        Zone::CornerThree,
        Zone::AboveBreakThree,
        Zone::Unclassified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::AtRim => "at_rim",
            Zone::Paint => "paint",
            Zone::Midrange => "midrange",
            Zone::CornerThree => "corner_three",
            Zone::AboveBreakThree => "above_break_three",
            Zone::Unclassified => "unclassified",
        }
    }

    /// Point value of a make from this zone, when the zone implies one.
    pub fn shot_value(&self) -> Option<u32> {
        match self {
            Zone::AtRim | Zone::Paint | Zone::Midrange => Some(2),
            Zone::CornerThree | Zone::AboveBreakThree => Some(3),
            Zone::Unclassified => None,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shooting aggregate for one zone of one team-game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneShot {
    pub season: Season,
    pub game_id: GameId,
    pub team_id: TeamId,
    pub zone: Zone,
    pub fgm: u32,
    pub fga: u32,
    pub points: u32,

    /// `None` when the zone had no attempts
    pub fg_pct: Option<f64>,

    /// Share of the team's field-goal attempts taken from this zone
    pub fga_share: Option<f64>,
}
