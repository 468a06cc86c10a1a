//! Lineup stints reconstructed from play-by-play.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::{BoxCounts, GameClock, GameId, PlayerId, TeamId};

/// A canonical five-player lineup. Order-irrelevant: ids are kept sorted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<PlayerId>", into = "Vec<PlayerId>")]
pub struct Lineup(Vec<PlayerId>);

impl Lineup {
    pub const SIZE: usize = 5;

    /// Build a lineup from exactly five distinct players.
    pub fn new<I: IntoIterator<Item = PlayerId>>(players: I) -> Option<Self> {
        let set: BTreeSet<PlayerId> = players.into_iter().collect();
        (set.len() == Self::SIZE).then(|| Self(set.into_iter().collect()))
    }

    /// Canonical key: sorted ids joined with `-`.
    pub fn key(&self) -> String {
        self.0
            .iter()
            .map(PlayerId::as_str)
            .collect::<Vec<_>>()
            .join("-")
    }

    pub fn players(&self) -> &[PlayerId] {
        &self.0
    }

    pub fn contains(&self, player: &PlayerId) -> bool {
        self.0.binary_search(player).is_ok()
    }
}

impl TryFrom<Vec<PlayerId>> for Lineup {
    type Error = String;

    fn try_from(players: Vec<PlayerId>) -> Result<Self, Self::Error> {
        let n = players.len();
        Lineup::new(players).ok_or(format!("lineup needs 5 distinct players, got {}", n))
    }
}

impl From<Lineup> for Vec<PlayerId> {
    fn from(lineup: Lineup) -> Self {
        lineup.0
    }
}

impl fmt::Display for Lineup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Why the on-court set could not be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// Starters flagged for the team were not exactly five
    StarterCount,
    /// A substitution removed a player not on court or added one already on
    SubstitutionMismatch,
    /// A player not on court was credited with a shot, rebound or turnover
    ActorOffCourt,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::StarterCount => write!(f, "starter_count"),
            UnresolvedReason::SubstitutionMismatch => write!(f, "substitution_mismatch"),
            UnresolvedReason::ActorOffCourt => write!(f, "actor_off_court"),
        }
    }
}

/// Resolution status of a stint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StintStatus {
    Resolved {
        lineup: Lineup,
    },
    Unresolved {
        reason: UnresolvedReason,
        /// Players believed on court, possibly fewer or more than five
        known_players: Vec<PlayerId>,
    },
}

impl StintStatus {
    pub fn lineup(&self) -> Option<&Lineup> {
        match self {
            StintStatus::Resolved { lineup } => Some(lineup),
            StintStatus::Unresolved { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, StintStatus::Resolved { .. })
    }
}

/// A contiguous clock segment with one fixed on-court set for one team.
/// Never mutated after the reconstructor emits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupStint {
    pub game_id: GameId,
    pub team_id: TeamId,

    /// 1-based order within the team's game
    pub sequence: u32,

    pub period: u8,
    pub start_clock: GameClock,
    pub end_clock: GameClock,

    pub status: StintStatus,

    /// Counts accumulated by this team while the stint was open
    pub team: BoxCounts,

    /// Counts accumulated by the opponent while the stint was open
    pub opponent: BoxCounts,

    pub possessions: f64,
    pub opponent_possessions: f64,

    /// Number of events attributed to the stint
    pub event_count: u32,
}

impl LineupStint {
    pub fn duration_secs(&self) -> f64 {
        self.start_clock.tenths().saturating_sub(self.end_clock.tenths()) as f64 / 10.0
    }

    pub fn lineup_key(&self) -> Option<String> {
        self.status.lineup().map(Lineup::key)
    }
}
