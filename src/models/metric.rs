//! Metric identifiers and per-record metric sets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Every derived metric the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum MetricId {
    Possessions,
    Pace,
    EfgPct,
    TsPct,
    FgPct,
    Fg2Pct,
    Fg3Pct,
    FtPct,
    Fg3Rate,
    Ftr,
    TovPct,
    OrebPct,
    DrebPct,
    AstPct,
    AstTov,
    StlPct,
    BlkPct,
    ORtg,
    DRtg,
    NetRtg,
    UsgPct,
    PlayerTovPct,
    PtsPer40,
    RebPer40,
    AstPer40,
    StlPer40,
    BlkPer40,
    TovPer40,
}

/// Metrics computed for every team-game.
pub const TEAM_METRICS: [MetricId; 20] = [
    MetricId::Possessions,
    MetricId::Pace,
    MetricId::EfgPct,
    MetricId::TsPct,
    MetricId::FgPct,
    MetricId::Fg2Pct,
    MetricId::Fg3Pct,
    MetricId::FtPct,
    MetricId::Fg3Rate,
    MetricId::Ftr,
    MetricId::TovPct,
    MetricId::OrebPct,
    MetricId::DrebPct,
    MetricId::AstPct,
    MetricId::AstTov,
    MetricId::StlPct,
    MetricId::BlkPct,
    MetricId::ORtg,
    MetricId::DRtg,
    MetricId::NetRtg,
];

/// Metrics computed for every player-game.
pub const PLAYER_METRICS: [MetricId; 17] = [
    MetricId::EfgPct,
    MetricId::TsPct,
    MetricId::FgPct,
    MetricId::Fg3Pct,
    MetricId::FtPct,
    MetricId::Fg3Rate,
    MetricId::Ftr,
    MetricId::UsgPct,
    MetricId::AstPct,
    MetricId::AstTov,
    MetricId::PlayerTovPct,
    MetricId::PtsPer40,
    MetricId::RebPer40,
    MetricId::AstPer40,
    MetricId::StlPer40,
    MetricId::BlkPer40,
    MetricId::TovPer40,
];

/// Metrics carried as last-N rolling context on team rows.
pub const ROLLING_METRICS: [MetricId; 7] = [
    MetricId::ORtg,
    MetricId::DRtg,
    MetricId::NetRtg,
    MetricId::EfgPct,
    MetricId::TsPct,
    MetricId::TovPct,
    MetricId::Pace,
];

impl MetricId {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricId::Possessions => "possessions",
            MetricId::Pace => "pace",
            MetricId::EfgPct => "efg_pct",
            MetricId::TsPct => "ts_pct",
            MetricId::FgPct => "fg_pct",
            MetricId::Fg2Pct => "fg2_pct",
            MetricId::Fg3Pct => "fg3_pct",
            MetricId::FtPct => "ft_pct",
            MetricId::Fg3Rate => "fg3_rate",
            MetricId::Ftr => "ftr",
            MetricId::TovPct => "tov_pct",
            MetricId::OrebPct => "oreb_pct",
            MetricId::DrebPct => "dreb_pct",
            MetricId::AstPct => "ast_pct",
            MetricId::AstTov => "ast_tov",
            MetricId::StlPct => "stl_pct",
            MetricId::BlkPct => "blk_pct",
            MetricId::ORtg => "ortg",
            MetricId::DRtg => "drtg",
            MetricId::NetRtg => "net_rtg",
            MetricId::UsgPct => "usg_pct",
            MetricId::PlayerTovPct => "player_tov_pct",
            MetricId::PtsPer40 => "pts_per_40",
            MetricId::RebPer40 => "reb_per_40",
            MetricId::AstPer40 => "ast_per_40",
            MetricId::StlPer40 => "stl_per_40",
            MetricId::BlkPer40 => "blk_per_40",
            MetricId::TovPer40 => "tov_per_40",
        }
    }

    /// Metrics where a smaller value is the better outcome. Their raw
    /// percentile is inverted before labeling.
    pub fn lower_is_better(&self) -> bool {
        matches!(
            self,
            MetricId::TovPct | MetricId::DRtg | MetricId::PlayerTovPct | MetricId::TovPer40
        )
    }

    /// Shooting metrics need the attempts floor before a player value is
    /// admitted to a benchmark population.
    pub fn is_shooting(&self) -> bool {
        matches!(
            self,
            MetricId::EfgPct
                | MetricId::TsPct
                | MetricId::FgPct
                | MetricId::Fg2Pct
                | MetricId::Fg3Pct
                | MetricId::FtPct
                | MetricId::Fg3Rate
                | MetricId::Ftr
        )
    }

    fn all() -> impl Iterator<Item = MetricId> {
        TEAM_METRICS.into_iter().chain(PLAYER_METRICS)
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MetricId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricId::all()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown metric: {}", s))
    }
}

impl TryFrom<String> for MetricId {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MetricId> for &'static str {
    fn from(m: MetricId) -> Self {
        m.as_str()
    }
}

/// Which usage formula produced a player's USG%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageBasis {
    /// Full formula normalized by the team's possessions-used
    TeamNormalized,
    /// Per-minute approximation used when team totals are unavailable
    PerMinuteProxy,
}

impl UsageBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageBasis::TeamNormalized => "team_normalized",
            UsageBasis::PerMinuteProxy => "per_minute_proxy",
        }
    }
}

/// Metric values for one record. A zero denominator is stored as `None`
/// and serialized as `null`, never as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricSet(BTreeMap<MetricId, Option<f64>>);

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, metric: MetricId, value: Option<f64>) {
        self.0.insert(metric, value.filter(|v| v.is_finite()));
    }

    /// The value of `metric`, or `None` when missing or never computed.
    pub fn get(&self, metric: MetricId) -> Option<f64> {
        self.0.get(&metric).copied().flatten()
    }

    pub fn contains(&self, metric: MetricId) -> bool {
        self.0.contains_key(&metric)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricId, Option<f64>)> + '_ {
        self.0.iter().map(|(m, v)| (*m, *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(MetricId, Option<f64>)> for MetricSet {
    fn from_iter<I: IntoIterator<Item = (MetricId, Option<f64>)>>(iter: I) -> Self {
        let mut set = MetricSet::new();
        for (metric, value) in iter {
            set.insert(metric, value);
        }
        set
    }
}
