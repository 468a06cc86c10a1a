//! Categorical labels derived from percentiles and game results.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::MetricId;

/// Tier classification based on a label percentile (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Low,
    BelowAverage,
    Average,
    AboveAverage,
    Great,
    Elite,
}

impl Tier {
    /// Calculate tier from a percentile.
    pub fn from_percentile(percentile: f64) -> Self {
        if percentile >= 90.0 {
            Tier::Elite
        } else if percentile >= 75.0 {
            Tier::Great
        } else if percentile >= 60.0 {
            Tier::AboveAverage
        } else if percentile >= 40.0 {
            Tier::Average
        } else if percentile >= 25.0 {
            Tier::BelowAverage
        } else {
            Tier::Low
        }
    }

    /// Display color (diverging green-to-red scale).
    pub fn color(&self) -> &'static str {
        match self {
            Tier::Elite => "#1a9850",
            Tier::Great => "#91cf60",
            Tier::AboveAverage => "#d9ef8b",
            Tier::Average => "#d9d9d9",
            Tier::BelowAverage => "#fdae61",
            Tier::Low => "#d73027",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Elite => write!(f, "Elite"),
            Tier::Great => write!(f, "Great"),
            Tier::AboveAverage => write!(f, "Above Average"),
            Tier::Average => write!(f, "Average"),
            Tier::BelowAverage => write!(f, "Below Average"),
            Tier::Low => write!(f, "Low"),
        }
    }
}

/// Player archetype from usage and true-shooting percentiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerRole {
    Star,
    HighVolumeScorer,
    InefficientVolume,
    EfficientRolePlayer,
    SolidContributor,
    StrugglingScorer,
    Specialist,
    LimitedRole,
}

impl PlayerRole {
    /// Usage bands: high >= 75, moderate 40..75, low < 40. Efficiency
    /// bands: high >= 60, average 40..60, low < 40. Low usage collapses
    /// average and low efficiency into `LimitedRole`.
    pub fn from_percentiles(usg_percentile: f64, ts_percentile: f64) -> Self {
        let high_ts = ts_percentile >= 60.0;
        let avg_ts = (40.0..60.0).contains(&ts_percentile);

        if usg_percentile >= 75.0 {
            if high_ts {
                PlayerRole::Star
            } else if avg_ts {
                PlayerRole::HighVolumeScorer
            } else {
                PlayerRole::InefficientVolume
            }
        } else if usg_percentile >= 40.0 {
            if high_ts {
                PlayerRole::EfficientRolePlayer
            } else if avg_ts {
                PlayerRole::SolidContributor
            } else {
                PlayerRole::StrugglingScorer
            }
        } else if high_ts {
            PlayerRole::Specialist
        } else {
            PlayerRole::LimitedRole
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            PlayerRole::Star => "#1a9850",
            PlayerRole::HighVolumeScorer => "#91cf60",
            PlayerRole::InefficientVolume => "#fdae61",
            PlayerRole::EfficientRolePlayer => "#66bd63",
            PlayerRole::SolidContributor => "#d9d9d9",
            PlayerRole::StrugglingScorer => "#f46d43",
            PlayerRole::Specialist => "#a6d96a",
            PlayerRole::LimitedRole => "#bdbdbd",
        }
    }
}

impl fmt::Display for PlayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlayerRole::Star => "Star",
            PlayerRole::HighVolumeScorer => "High Volume Scorer",
            PlayerRole::InefficientVolume => "Inefficient Volume",
            PlayerRole::EfficientRolePlayer => "Efficient Role Player",
            PlayerRole::SolidContributor => "Solid Contributor",
            PlayerRole::StrugglingScorer => "Struggling Scorer",
            PlayerRole::Specialist => "Specialist",
            PlayerRole::LimitedRole => "Limited Role",
        };
        write!(f, "{}", label)
    }
}

/// How lopsided the final score was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginContext {
    Blowout,
    Comfortable,
    CloseGame,
}

impl fmt::Display for MarginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarginContext::Blowout => write!(f, "Blowout"),
            MarginContext::Comfortable => write!(f, "Comfortable"),
            MarginContext::CloseGame => write!(f, "Close Game"),
        }
    }
}

/// Game context combining margin with AP rankings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameContext {
    /// Both teams ranked
    RankedShowdown { close: bool },
    /// Unranked team beat a ranked one, or a ranked team beat one ranked
    /// far above it
    Upset,
    /// Exactly one team ranked
    RankedMatchup { margin: MarginContext },
    Unranked { margin: MarginContext },
}

impl fmt::Display for GameContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameContext::RankedShowdown { close: true } => write!(f, "Ranked Showdown (Close)"),
            GameContext::RankedShowdown { close: false } => write!(f, "Ranked Showdown"),
            GameContext::Upset => write!(f, "Upset"),
            GameContext::RankedMatchup { margin } => write!(f, "Ranked Matchup ({})", margin),
            GameContext::Unranked { margin } => write!(f, "{}", margin),
        }
    }
}

/// One reason the winner won: a Four-Factor style metric where its label
/// percentile beat the opponent's by at least the configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinDriver {
    pub metric: MetricId,

    /// Team label percentile minus opponent label percentile
    pub differential: f64,
}

impl WinDriver {
    pub fn description(&self) -> &'static str {
        match self.metric {
            MetricId::EfgPct => "Shot making",
            MetricId::TovPct => "Ball security",
            MetricId::OrebPct => "Offensive rebounding",
            MetricId::Ftr => "Getting to the line",
            MetricId::Fg3Pct => "Three-point shooting",
            MetricId::AstPct => "Ball movement",
            _ => "Other",
        }
    }
}

impl fmt::Display for WinDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (+{:.0})", self.description(), self.differential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_from_percentile() {
        assert_eq!(Tier::from_percentile(100.0), Tier::Elite);
        assert_eq!(Tier::from_percentile(90.0), Tier::Elite);
        assert_eq!(Tier::from_percentile(89.99), Tier::Great);
        assert_eq!(Tier::from_percentile(75.0), Tier::Great);
        assert_eq!(Tier::from_percentile(74.9), Tier::AboveAverage);
        assert_eq!(Tier::from_percentile(60.0), Tier::AboveAverage);
        assert_eq!(Tier::from_percentile(59.0), Tier::Average);
        assert_eq!(Tier::from_percentile(40.0), Tier::Average);
        assert_eq!(Tier::from_percentile(39.9), Tier::BelowAverage);
        assert_eq!(Tier::from_percentile(25.0), Tier::BelowAverage);
        assert_eq!(Tier::from_percentile(24.9), Tier::Low);
        assert_eq!(Tier::from_percentile(0.0), Tier::Low);
    }

    #[test]
    fn test_tier_order_and_display() {
        assert!(Tier::Elite > Tier::Great);
        assert!(Tier::Low < Tier::BelowAverage);
        assert_eq!(format!("{}", Tier::AboveAverage), "Above Average");
        assert_eq!(Tier::Low.color(), "#d73027");
    }

    #[test]
    fn test_player_roles() {
        assert_eq!(PlayerRole::from_percentiles(80.0, 70.0), PlayerRole::Star);
        assert_eq!(PlayerRole::from_percentiles(80.0, 50.0), PlayerRole::HighVolumeScorer);
        assert_eq!(PlayerRole::from_percentiles(80.0, 20.0), PlayerRole::InefficientVolume);
        assert_eq!(PlayerRole::from_percentiles(50.0, 60.0), PlayerRole::EfficientRolePlayer);
        assert_eq!(PlayerRole::from_percentiles(50.0, 40.0), PlayerRole::SolidContributor);
        assert_eq!(PlayerRole::from_percentiles(74.9, 39.9), PlayerRole::StrugglingScorer);
        assert_eq!(PlayerRole::from_percentiles(10.0, 95.0), PlayerRole::Specialist);
        assert_eq!(PlayerRole::from_percentiles(39.9, 59.9), PlayerRole::LimitedRole);
        assert_eq!(PlayerRole::from_percentiles(0.0, 0.0), PlayerRole::LimitedRole);
    }

    #[test]
    fn test_game_context_display() {
        assert_eq!(
            GameContext::RankedShowdown { close: true }.to_string(),
            "Ranked Showdown (Close)"
        );
        assert_eq!(
            GameContext::RankedMatchup {
                margin: MarginContext::Blowout
            }
            .to_string(),
            "Ranked Matchup (Blowout)"
        );
        assert_eq!(
            GameContext::Unranked {
                margin: MarginContext::CloseGame
            }
            .to_string(),
            "Close Game"
        );
    }

    #[test]
    fn test_game_context_serialization() {
        let ctx = GameContext::RankedMatchup {
            margin: MarginContext::Comfortable,
        };
        let json = serde_json::to_string(&ctx).unwrap();
        assert_eq!(json, r#"{"kind":"ranked_matchup","margin":"comfortable"}"#);
        let back: GameContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ctx);
    }

    #[test]
    fn test_win_driver_display() {
        let driver = WinDriver {
            metric: MetricId::OrebPct,
            differential: 32.4,
        };
        assert_eq!(driver.to_string(), "Offensive rebounding (+32)");
    }
}
