//! Benchmark distributions and the versioned snapshot that holds them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::{MetricId, PositionGroup, Season};

/// Population a distribution was built over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Team,
    Player,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Team => write!(f, "team"),
            Scope::Player => write!(f, "player"),
        }
    }
}

/// Identifies one distribution. `position` is `None` for the
/// all-positions (and team) population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BenchmarkKey {
    pub season: Season,
    pub scope: Scope,
    pub metric: MetricId,
    pub position: Option<PositionGroup>,
}

impl fmt::Display for BenchmarkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{}/{}/{}/{}", self.season, self.scope, self.metric, pos),
            None => write!(f, "{}/{}/{}", self.season, self.scope, self.metric),
        }
    }
}

/// Summary statistics of one metric across a reference population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkDistribution {
    #[serde(flatten)]
    pub key: BenchmarkKey,
    pub n: usize,
    pub mean: f64,

    /// Sample standard deviation, `None` when `n < 2`
    pub std: Option<f64>,

    pub min: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub max: f64,
}

impl BenchmarkDistribution {
    /// Interpolation anchors as (value, percentile) pairs, ascending.
    pub fn anchors(&self) -> [(f64, f64); 7] {
        [
            (self.min, 0.0),
            (self.p10, 10.0),
            (self.p25, 25.0),
            (self.p50, 50.0),
            (self.p75, 75.0),
            (self.p90, 90.0),
            (self.max, 100.0),
        ]
    }
}

/// A versioned, immutable set of distributions. Callers receive it
/// explicitly; nothing reads benchmarks from ambient state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SnapshotFile", into = "SnapshotFile")]
pub struct BenchmarkSnapshot {
    version: u64,
    built_at: Option<DateTime<Utc>>,
    distributions: BTreeMap<BenchmarkKey, BenchmarkDistribution>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    version: u64,
    #[serde(default)]
    built_at: Option<DateTime<Utc>>,
    distributions: Vec<BenchmarkDistribution>,
}

impl From<SnapshotFile> for BenchmarkSnapshot {
    fn from(file: SnapshotFile) -> Self {
        BenchmarkSnapshot::new(file.version, file.built_at, file.distributions)
    }
}

impl From<BenchmarkSnapshot> for SnapshotFile {
    fn from(snapshot: BenchmarkSnapshot) -> Self {
        SnapshotFile {
            version: snapshot.version,
            built_at: snapshot.built_at,
            distributions: snapshot.distributions.into_values().collect(),
        }
    }
}

impl BenchmarkSnapshot {
    pub fn new(
        version: u64,
        built_at: Option<DateTime<Utc>>,
        distributions: Vec<BenchmarkDistribution>,
    ) -> Self {
        Self {
            version,
            built_at,
            distributions: distributions.into_iter().map(|d| (d.key, d)).collect(),
        }
    }

    /// Version 0 with no distributions; every lookup against it fails.
    pub fn empty() -> Self {
        Self::new(0, None, Vec::new())
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }

    pub fn get(&self, key: &BenchmarkKey) -> Option<&BenchmarkDistribution> {
        self.distributions.get(key)
    }

    pub fn len(&self) -> usize {
        self.distributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distributions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BenchmarkDistribution> {
        self.distributions.values()
    }

    pub fn for_season(&self, season: Season) -> impl Iterator<Item = &BenchmarkDistribution> {
        self.distributions
            .values()
            .filter(move |d| d.key.season == season)
    }

    pub fn seasons(&self) -> Vec<Season> {
        let mut seasons: Vec<Season> = self.distributions.keys().map(|k| k.season).collect();
        seasons.dedup();
        seasons
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_snapshot_lookup() {
        let key = team_key(2025, MetricId::EfgPct);
        let snapshot = BenchmarkSnapshot::new(3, Some(Utc::now()), vec![distribution(key, 0.4, 0.02)]);
        assert_eq!(snapshot.version(), 3);
        assert!(snapshot.get(&key).is_some());
        assert!(snapshot.get(&team_key(2024, MetricId::EfgPct)).is_none());
        assert_eq!(snapshot.seasons(), vec![2025]);
    }

    #[test]
    fn test_snapshot_serialization_sorted() {
        let a = distribution(team_key(2025, MetricId::ORtg), 90.0, 5.0);
        let b = distribution(team_key(2024, MetricId::ORtg), 90.0, 5.0);
        let snapshot = BenchmarkSnapshot::new(1, None, vec![a, b]);
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: BenchmarkSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
        let seasons: Vec<Season> = back.iter().map(|d| d.key.season).collect();
        assert_eq!(seasons, vec![2024, 2025]);
    }

    #[test]
    fn test_distribution_json_is_flat() {
        let d = distribution(team_key(2025, MetricId::TovPct), 0.1, 0.01);
        let value = serde_json::to_value(&d).unwrap();
        assert_eq!(value["metric"], "tov_pct");
        assert_eq!(value["scope"], "team");
        assert_eq!(value["season"], 2025);
        assert!(value["position"].is_null());
    }

    #[test]
    fn test_key_display() {
        let key = BenchmarkKey {
            season: 2025,
            scope: Scope::Player,
            metric: MetricId::UsgPct,
            position: Some(PositionGroup::Guard),
        };
        assert_eq!(key.to_string(), "2025/player/usg_pct/Guard");
    }
}
