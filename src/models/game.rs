//! Box-score records: raw wire rows, the validation gate, and the
//! validated immutable records the engine computes from.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{GameId, PlayerId, Season, TeamId};

/// Why a raw record failed the validation gate. The record is rejected;
/// nothing is fabricated in its place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("missing required field `{field}` in {record}")]
    MissingField { record: String, field: &'static str },

    #[error("inconsistent `{field}` in {record}: {detail}")]
    Inconsistent {
        record: String,
        field: &'static str,
        detail: String,
    },
}

impl RecordError {
    pub fn field(&self) -> &'static str {
        match self {
            RecordError::MissingField { field, .. } | RecordError::Inconsistent { field, .. } => {
                field
            }
        }
    }
}

fn require<T>(value: Option<T>, record: &str, field: &'static str) -> Result<T, RecordError> {
    value.ok_or_else(|| RecordError::MissingField {
        record: record.to_string(),
        field,
    })
}

/// Minutes as delivered upstream: either a number or a `"MM:SS"` string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawMinutes {
    Number(f64),
    Text(String),
}

impl RawMinutes {
    /// Parse to fractional minutes. Unparseable text yields `None`.
    pub fn to_minutes(&self) -> Option<f64> {
        match self {
            RawMinutes::Number(m) if m.is_finite() && *m >= 0.0 => Some(*m),
            RawMinutes::Number(_) => None,
            RawMinutes::Text(s) => parse_minutes(s),
        }
    }
}

/// Parse `"32:45"` or `"32"` into fractional minutes.
pub fn parse_minutes(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    match s.split_once(':') {
        Some((m, sec)) => {
            let m: f64 = m.trim().parse().ok()?;
            let sec: f64 = sec.trim().parse().ok()?;
            if m < 0.0 || !(0.0..60.0).contains(&sec) {
                return None;
            }
            Some(m + sec / 60.0)
        }
        None => s.parse::<f64>().ok().filter(|m| *m >= 0.0),
    }
}

/// Counting stats shared by team and player box scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxCounts {
    pub pts: u32,
    pub fgm: u32,
    pub fga: u32,
    pub fg3m: u32,
    pub fg3a: u32,
    pub ftm: u32,
    pub fta: u32,
    pub orb: u32,
    pub drb: u32,
    pub ast: u32,
    pub stl: u32,
    pub blk: u32,
    pub tov: u32,
    pub pf: u32,
}

/// A team's box score for one game.
pub type TeamBox = BoxCounts;

impl BoxCounts {
    pub fn rebounds(&self) -> u32 {
        self.orb + self.drb
    }
}

/// Raw counting fields as they arrive on the wire. Every field is optional
/// so the gate can tell "absent" from "zero".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCounts {
    #[serde(default)]
    pub points: Option<u32>,
    #[serde(default)]
    pub field_goals_made: Option<u32>,
    #[serde(default)]
    pub field_goals_attempted: Option<u32>,
    #[serde(default)]
    pub three_point_field_goals_made: Option<u32>,
    #[serde(default)]
    pub three_point_field_goals_attempted: Option<u32>,
    #[serde(default)]
    pub free_throws_made: Option<u32>,
    #[serde(default)]
    pub free_throws_attempted: Option<u32>,
    #[serde(default)]
    pub offensive_rebounds: Option<u32>,
    #[serde(default)]
    pub defensive_rebounds: Option<u32>,
    #[serde(default)]
    pub assists: Option<u32>,
    #[serde(default)]
    pub steals: Option<u32>,
    #[serde(default)]
    pub blocks: Option<u32>,
    #[serde(default)]
    pub turnovers: Option<u32>,
    #[serde(default)]
    pub fouls: Option<u32>,
}

impl RawCounts {
    /// Validate into [`BoxCounts`]. Also rejects impossible splits
    /// (makes above attempts, threes above field goals).
    pub fn validate(&self, record: &str) -> Result<BoxCounts, RecordError> {
        let counts = BoxCounts {
            pts: require(self.points, record, "points")?,
            fgm: require(self.field_goals_made, record, "field_goals_made")?,
            fga: require(self.field_goals_attempted, record, "field_goals_attempted")?,
            fg3m: require(
                self.three_point_field_goals_made,
                record,
                "three_point_field_goals_made",
            )?,
            fg3a: require(
                self.three_point_field_goals_attempted,
                record,
                "three_point_field_goals_attempted",
            )?,
            ftm: require(self.free_throws_made, record, "free_throws_made")?,
            fta: require(self.free_throws_attempted, record, "free_throws_attempted")?,
            orb: require(self.offensive_rebounds, record, "offensive_rebounds")?,
            drb: require(self.defensive_rebounds, record, "defensive_rebounds")?,
            ast: require(self.assists, record, "assists")?,
            stl: require(self.steals, record, "steals")?,
            blk: require(self.blocks, record, "blocks")?,
            tov: require(self.turnovers, record, "turnovers")?,
            pf: require(self.fouls, record, "fouls")?,
        };

        let inconsistent = |field, detail: String| RecordError::Inconsistent {
            record: record.to_string(),
            field,
            detail,
        };
        if counts.fgm > counts.fga {
            return Err(inconsistent(
                "field_goals_made",
                format!("{} made of {} attempted", counts.fgm, counts.fga),
            ));
        }
        if counts.fg3m > counts.fg3a || counts.fg3a > counts.fga || counts.fg3m > counts.fgm {
            return Err(inconsistent(
                "three_point_field_goals_made",
                format!(
                    "{}/{} threes against {}/{} field goals",
                    counts.fg3m, counts.fg3a, counts.fgm, counts.fga
                ),
            ));
        }
        if counts.ftm > counts.fta {
            return Err(inconsistent(
                "free_throws_made",
                format!("{} made of {} attempted", counts.ftm, counts.fta),
            ));
        }
        Ok(counts)
    }
}

/// One team's side of one game as delivered upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTeamGame {
    pub season: Season,
    pub game_id: GameId,
    pub team_id: TeamId,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub game_date: Option<NaiveDate>,
    #[serde(default)]
    pub home: Option<bool>,
    /// AP poll rank at game time, if ranked.
    #[serde(default)]
    pub ap_rank: Option<u8>,
    #[serde(default)]
    pub minutes: Option<RawMinutes>,
    #[serde(flatten)]
    pub counts: RawCounts,
}

impl RawTeamGame {
    pub fn describe(&self) -> String {
        format!("team-game {}/{}", self.game_id, self.team_id)
    }

    /// Validation gate for a team side.
    pub fn validate(&self) -> Result<TeamSide, RecordError> {
        let record = self.describe();
        let game_date = require(self.game_date, &record, "game_date")?;
        let minutes = require(
            self.minutes.as_ref().and_then(RawMinutes::to_minutes),
            &record,
            "minutes",
        )?;
        let counts = self.counts.validate(&record)?;

        Ok(TeamSide {
            season: self.season,
            game_id: self.game_id.clone(),
            game_date,
            team_id: self.team_id.clone(),
            team_name: self.team_name.clone(),
            home: self.home,
            ap_rank: self.ap_rank,
            minutes,
            counts,
        })
    }
}

/// A validated team side of a game, before pairing with its opponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSide {
    pub season: Season,
    pub game_id: GameId,
    pub game_date: NaiveDate,
    pub team_id: TeamId,
    pub team_name: Option<String>,
    pub home: Option<bool>,
    pub ap_rank: Option<u8>,
    /// Team minutes (200 for a regulation game).
    pub minutes: f64,
    pub counts: BoxCounts,
}

/// Team-game record: a team's counting stats plus its opponent's for the
/// same game. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub team: TeamSide,
    pub opponent: TeamSide,
}

impl GameRecord {
    pub fn season(&self) -> Season {
        self.team.season
    }

    pub fn game_id(&self) -> &GameId {
        &self.team.game_id
    }

    pub fn game_date(&self) -> NaiveDate {
        self.team.game_date
    }

    pub fn team_id(&self) -> &TeamId {
        &self.team.team_id
    }

    pub fn opponent_id(&self) -> &TeamId {
        &self.opponent.team_id
    }

    /// Points scored minus points allowed.
    pub fn margin(&self) -> i64 {
        self.team.counts.pts as i64 - self.opponent.counts.pts as i64
    }

    pub fn won(&self) -> bool {
        self.margin() > 0
    }
}

/// Coarse position grouping used to scope player benchmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionGroup {
    Guard,
    Forward,
    Center,
    Other,
}

impl PositionGroup {
    pub const SCOPED: [PositionGroup; 3] =
        [PositionGroup::Guard, PositionGroup::Forward, PositionGroup::Center];

    /// Normalize free-text positions ("Point Guard", "F", "G/F", "C").
    /// Combo abbreviations take their first listed position.
    pub fn from_position(position: Option<&str>) -> Self {
        let Some(pos) = position else {
            return PositionGroup::Other;
        };
        let pos = pos.trim().to_ascii_lowercase();
        if pos.contains("guard") {
            return PositionGroup::Guard;
        }
        if pos.contains("forward") {
            return PositionGroup::Forward;
        }
        if pos.contains("center") {
            return PositionGroup::Center;
        }
        let head = pos.split(['/', '-', ' ']).next().unwrap_or("");
        match head {
            "g" | "pg" | "sg" => PositionGroup::Guard,
            "f" | "sf" | "pf" => PositionGroup::Forward,
            "c" => PositionGroup::Center,
            _ => PositionGroup::Other,
        }
    }
}

impl std::fmt::Display for PositionGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionGroup::Guard => write!(f, "Guard"),
            PositionGroup::Forward => write!(f, "Forward"),
            PositionGroup::Center => write!(f, "Center"),
            PositionGroup::Other => write!(f, "Other"),
        }
    }
}

/// One player's line in one game as delivered upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlayerGame {
    pub season: Season,
    pub game_id: GameId,
    pub team_id: TeamId,
    pub player_id: PlayerId,
    #[serde(default)]
    pub player_name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub starter: Option<bool>,
    #[serde(default)]
    pub minutes: Option<RawMinutes>,
    #[serde(flatten)]
    pub counts: RawCounts,
}

impl RawPlayerGame {
    pub fn describe(&self) -> String {
        format!(
            "player-game {}/{}/{}",
            self.game_id, self.team_id, self.player_id
        )
    }

    /// Validation gate for a player line.
    pub fn validate(&self) -> Result<PlayerGameRecord, RecordError> {
        let record = self.describe();
        let starter = require(self.starter, &record, "starter")?;
        let minutes = require(
            self.minutes.as_ref().and_then(RawMinutes::to_minutes),
            &record,
            "minutes",
        )?;
        let counts = self.counts.validate(&record)?;

        Ok(PlayerGameRecord {
            season: self.season,
            game_id: self.game_id.clone(),
            team_id: self.team_id.clone(),
            player_id: self.player_id.clone(),
            player_name: self.player_name.clone(),
            position: PositionGroup::from_position(self.position.as_deref()),
            starter,
            minutes,
            counts,
        })
    }
}

/// Validated per-player game line. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerGameRecord {
    pub season: Season,
    pub game_id: GameId,
    pub team_id: TeamId,
    pub player_id: PlayerId,
    pub player_name: Option<String>,
    pub position: PositionGroup,
    pub starter: bool,
    pub minutes: f64,
    pub counts: BoxCounts,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn raw_counts(pts: u32, fgm: u32, fga: u32, orb: u32, drb: u32) -> RawCounts {
        RawCounts {
            points: Some(pts),
            field_goals_made: Some(fgm),
            field_goals_attempted: Some(fga),
            three_point_field_goals_made: Some(5),
            three_point_field_goals_attempted: Some(15),
            free_throws_made: Some(10),
            free_throws_attempted: Some(14),
            offensive_rebounds: Some(orb),
            defensive_rebounds: Some(drb),
            assists: Some(14),
            steals: Some(7),
            blocks: Some(3),
            turnovers: Some(12),
            fouls: Some(16),
        }
    }

    pub fn raw_team_game(game: &str, team: &str, date: (i32, u32, u32), counts: RawCounts) -> RawTeamGame {
        RawTeamGame {
            season: 2025,
            game_id: GameId::from(game),
            team_id: TeamId::from(team),
            team_name: Some(format!("Team {}", team)),
            game_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            home: None,
            ap_rank: None,
            minutes: Some(RawMinutes::Number(200.0)),
            counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_parse_minutes() {
        assert_eq!(parse_minutes("32:45"), Some(32.75));
        assert_eq!(parse_minutes("32"), Some(32.0));
        assert_eq!(parse_minutes(" 0:30 "), Some(0.5));
        assert_eq!(parse_minutes("abc"), None);
        assert_eq!(parse_minutes(""), None);
        assert_eq!(parse_minutes("12:75"), None);
    }

    #[test]
    fn test_raw_minutes_untagged() {
        let n: RawMinutes = serde_json::from_str("31.5").unwrap();
        let t: RawMinutes = serde_json::from_str("\"31:30\"").unwrap();
        assert_eq!(n.to_minutes(), Some(31.5));
        assert_eq!(t.to_minutes(), Some(31.5));
    }

    #[test]
    fn test_team_validation_ok() {
        let raw = raw_team_game("g1", "A", (2025, 1, 4), raw_counts(70, 25, 60, 10, 25));
        let side = raw.validate().unwrap();
        assert_eq!(side.counts.pts, 70);
        assert_eq!(side.minutes, 200.0);
        assert_eq!(side.counts.rebounds(), 35);
    }

    #[test]
    fn test_team_validation_missing_field_rejects() {
        let mut counts = raw_counts(70, 25, 60, 10, 25);
        counts.turnovers = None;
        let raw = raw_team_game("g1", "A", (2025, 1, 4), counts);
        let err = raw.validate().unwrap_err();
        assert_eq!(err.field(), "turnovers");
        assert!(err.to_string().contains("g1/A"));
    }

    #[test]
    fn test_team_validation_zero_is_not_missing() {
        let mut counts = raw_counts(70, 25, 60, 10, 25);
        counts.blocks = Some(0);
        let raw = raw_team_game("g1", "A", (2025, 1, 4), counts);
        assert_eq!(raw.validate().unwrap().counts.blk, 0);
    }

    #[test]
    fn test_team_validation_requires_date() {
        let mut raw = raw_team_game("g1", "A", (2025, 1, 4), raw_counts(70, 25, 60, 10, 25));
        raw.game_date = None;
        assert_eq!(raw.validate().unwrap_err().field(), "game_date");
    }

    #[test]
    fn test_validation_rejects_makes_above_attempts() {
        let raw = raw_team_game("g1", "A", (2025, 1, 4), raw_counts(70, 61, 60, 10, 25));
        let err = raw.validate().unwrap_err();
        assert_eq!(err.field(), "field_goals_made");
        assert!(matches!(err, RecordError::Inconsistent { .. }));
        let msg = err.to_string();
        assert!(msg.contains("61 made of 60 attempted"), "{}", msg);
        assert!(!msg.contains("missing"));
    }

    #[test]
    fn test_raw_team_game_flattened_json() {
        let json = r#"{
            "season": 2025, "game_id": "401", "team_id": "52",
            "game_date": "2025-01-04", "minutes": "200:00",
            "points": 70, "field_goals_made": 25, "field_goals_attempted": 60,
            "three_point_field_goals_made": 5, "three_point_field_goals_attempted": 15,
            "free_throws_made": 15, "free_throws_attempted": 20,
            "offensive_rebounds": 10, "defensive_rebounds": 25,
            "assists": 14, "steals": 7, "blocks": 3, "turnovers": 12, "fouls": 16
        }"#;
        let raw: RawTeamGame = serde_json::from_str(json).unwrap();
        let side = raw.validate().unwrap();
        assert_eq!(side.counts.fta, 20);
        assert_eq!(side.minutes, 200.0);
    }

    #[test]
    fn test_player_validation_requires_starter_flag() {
        let raw = RawPlayerGame {
            season: 2025,
            game_id: GameId::from("g1"),
            team_id: TeamId::from("A"),
            player_id: PlayerId::from("p1"),
            player_name: None,
            position: Some("Guard".into()),
            starter: None,
            minutes: Some(RawMinutes::Text("30:00".into())),
            counts: raw_counts(20, 8, 15, 1, 4),
        };
        assert_eq!(raw.validate().unwrap_err().field(), "starter");
    }

    #[test]
    fn test_position_group() {
        assert_eq!(PositionGroup::from_position(Some("Point Guard")), PositionGroup::Guard);
        assert_eq!(PositionGroup::from_position(Some("F")), PositionGroup::Forward);
        assert_eq!(PositionGroup::from_position(Some("G/F")), PositionGroup::Guard);
        assert_eq!(PositionGroup::from_position(Some("C")), PositionGroup::Center);
        assert_eq!(PositionGroup::from_position(Some("Athlete")), PositionGroup::Other);
        assert_eq!(PositionGroup::from_position(None), PositionGroup::Other);
        assert_eq!(format!("{}", PositionGroup::Center), "Center");
    }

    #[test]
    fn test_game_record_margin() {
        let a = raw_team_game("g1", "A", (2025, 1, 4), raw_counts(70, 25, 60, 10, 25))
            .validate()
            .unwrap();
        let b = raw_team_game("g1", "B", (2025, 1, 4), raw_counts(64, 24, 62, 12, 20))
            .validate()
            .unwrap();
        let record = GameRecord { team: a, opponent: b };
        assert_eq!(record.margin(), 6);
        assert!(record.won());
        assert_eq!(record.opponent_id().as_str(), "B");
    }
}
