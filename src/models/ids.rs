//! Identifiers: provider ids for games, teams and players, plus
//! deterministic record keys derived with SHA256.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// An opaque identifier. Provider ids are stored verbatim; derived record
/// keys are content hashes.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Generate a key from input fields.
    /// Uses SHA256 and takes the first 16 hex characters.
    pub fn generate(fields: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                hasher.update(b"|");
            }
            hasher.update(field.as_bytes());
        }
        let hash = hex::encode(hasher.finalize());
        Self(hash[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

pub type GameId = EntityId;
pub type TeamId = EntityId;
pub type PlayerId = EntityId;
pub type RecordKey = EntityId;

/// Season label, e.g. `2025` for the 2024-25 season.
pub type Season = u16;

/// Stable key for a derived team-game record.
pub fn team_record_key(season: Season, game_id: &GameId, team_id: &TeamId) -> RecordKey {
    EntityId::generate(&[&season.to_string(), game_id.as_str(), team_id.as_str()])
}

/// Stable key for a derived player-game record.
pub fn player_record_key(
    season: Season,
    game_id: &GameId,
    team_id: &TeamId,
    player_id: &PlayerId,
) -> RecordKey {
    EntityId::generate(&[
        &season.to_string(),
        game_id.as_str(),
        team_id.as_str(),
        player_id.as_str(),
    ])
}
