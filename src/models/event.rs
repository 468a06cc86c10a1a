//! Play-by-play event model.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{GameId, PlayerId, TeamId};

/// Game clock remaining in the period, stored in tenths of a second.
///
/// Accepts `"M:SS"`, `"M:SS.t"` or a number of seconds on the wire and
/// serializes back as `"M:SS"` text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawClock", into = "String")]
pub struct GameClock(u32);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawClock {
    Seconds(f64),
    Text(String),
}

impl GameClock {
    pub const ZERO: GameClock = GameClock(0);

    pub fn from_tenths(tenths: u32) -> Self {
        Self(tenths)
    }

    pub fn from_secs(secs: u32) -> Self {
        Self(secs * 10)
    }

    pub fn tenths(&self) -> u32 {
        self.0
    }

    pub fn seconds(&self) -> f64 {
        self.0 as f64 / 10.0
    }

    /// Parse `"7:42"`, `"0:04.3"` or `"42"`. Out-of-range values give
    /// `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (mins, secs) = match s.split_once(':') {
            Some((m, rest)) => (m.parse::<u32>().ok()?, rest),
            None => (0, s),
        };
        let secs: f64 = secs.parse().ok()?;
        if s.contains(':') && secs >= 60.0 {
            return None;
        }
        let tenths = mins.checked_mul(600)?.checked_add(secs_to_tenths(secs)?)?;
        Some(Self(tenths))
    }
}

fn secs_to_tenths(secs: f64) -> Option<u32> {
    let tenths = (secs * 10.0).round();
    if !tenths.is_finite() || tenths < 0.0 || tenths > u32::MAX as f64 {
        return None;
    }
    Some(tenths as u32)
}

impl TryFrom<RawClock> for GameClock {
    type Error = String;

    fn try_from(raw: RawClock) -> Result<Self, Self::Error> {
        match raw {
            RawClock::Seconds(s) => secs_to_tenths(s)
                .map(GameClock)
                .ok_or(format!("invalid clock seconds: {}", s)),
            RawClock::Text(t) => GameClock::parse(&t).ok_or(format!("invalid clock: {:?}", t)),
        }
    }
}

impl From<GameClock> for String {
    fn from(clock: GameClock) -> Self {
        clock.to_string()
    }
}

impl fmt::Display for GameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mins = self.0 / 600;
        let secs = (self.0 % 600) / 10;
        let tenths = self.0 % 10;
        if tenths == 0 {
            write!(f, "{}:{:02}", mins, secs)
        } else {
            write!(f, "{}:{:02}.{}", mins, secs, tenths)
        }
    }
}

/// Shot location in feet with the basket at the origin. `x` runs along the
/// baseline, `y` toward half court.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CourtPoint {
    pub x: f64,
    pub y: f64,
}

impl CourtPoint {
    pub fn distance(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// What happened. Actor ids are the players involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    PeriodStart,
    PeriodEnd,
    Substitution {
        player_in: PlayerId,
        player_out: PlayerId,
    },
    FieldGoal {
        shooter: PlayerId,
        made: bool,
        three: bool,
        #[serde(default)]
        assist: Option<PlayerId>,
        #[serde(default)]
        blocked_by: Option<PlayerId>,
        #[serde(default)]
        location: Option<CourtPoint>,
    },
    FreeThrow {
        shooter: PlayerId,
        made: bool,
    },
    Rebound {
        /// `None` for team rebounds.
        #[serde(default)]
        player: Option<PlayerId>,
        offensive: bool,
    },
    Turnover {
        #[serde(default)]
        player: Option<PlayerId>,
        #[serde(default)]
        stolen_by: Option<PlayerId>,
    },
    Foul {
        #[serde(default)]
        player: Option<PlayerId>,
    },
    Timeout,
    #[serde(other)]
    Other,
}

/// One play-by-play event. Immutable; strictly ordered by `sequence`
/// within a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayByPlayEvent {
    pub game_id: GameId,

    /// Provider sequence number, strictly increasing within a game
    pub sequence: u32,

    /// 1-based period number (overtimes continue past regulation)
    pub period: u8,

    /// Clock remaining in the period
    pub clock: GameClock,

    /// Team credited with the event (`None` for period markers)
    #[serde(default)]
    pub team_id: Option<TeamId>,

    pub kind: EventKind,

    /// Free-text play description from the provider
    #[serde(default)]
    pub description: Option<String>,
}
