//! Benchmark distribution builder.
//!
//! Distributions are always rebuilt from the full population of a season;
//! there is no incremental path. The result is a new snapshot that keeps
//! other seasons untouched and bumps the version.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{
    BenchmarkDistribution, BenchmarkKey, BenchmarkSnapshot, MetricId, MetricSet, PositionGroup,
    Scope, Season, UsageBasis, PLAYER_METRICS, TEAM_METRICS,
};

/// Errors that abort a benchmark rebuild.
#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("Non-finite value for {key}")]
    NonFinite { key: BenchmarkKey },

    #[error("No qualifying records for season {0}")]
    EmptySeason(Season),
}

/// Population rules for a rebuild.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkRules {
    /// Distributions with fewer values are skipped
    pub min_population: usize,
    /// Players under this many minutes are excluded
    pub min_player_minutes: f64,
    /// Shooting metrics also require this many field-goal attempts
    pub min_player_fga: u32,
}

impl Default for BenchmarkRules {
    fn default() -> Self {
        Self {
            min_population: 10,
            min_player_minutes: 10.0,
            min_player_fga: 5,
        }
    }
}

/// A player-game as seen by the builder.
#[derive(Debug, Clone, Copy)]
pub struct PlayerSample<'a> {
    pub position: PositionGroup,
    pub minutes: f64,
    pub fga: u32,
    pub usage_basis: Option<UsageBasis>,
    pub metrics: &'a MetricSet,
}

/// Linear-interpolated percentile of sorted values, `q` in [0, 1].
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let idx = q * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (idx - lo as f64)
}

/// Summarize one population. Returns `None` for an empty population.
pub fn summarize(
    key: BenchmarkKey,
    mut values: Vec<f64>,
) -> Result<Option<BenchmarkDistribution>, BenchmarkError> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(BenchmarkError::NonFinite { key });
    }
    if values.is_empty() {
        return Ok(None);
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let std = (n >= 2).then(|| {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    });

    Ok(Some(BenchmarkDistribution {
        key,
        n,
        mean,
        std,
        min: values[0],
        p10: percentile(&values, 0.10),
        p25: percentile(&values, 0.25),
        p50: percentile(&values, 0.50),
        p75: percentile(&values, 0.75),
        p90: percentile(&values, 0.90),
        max: values[n - 1],
    }))
}

/// Collects metric values per benchmark key.
#[derive(Debug, Default)]
struct Aggregator {
    values: BTreeMap<BenchmarkKey, Vec<f64>>,
}

impl Aggregator {
    fn push(&mut self, key: BenchmarkKey, value: Option<f64>) {
        let entry = self.values.entry(key).or_default();
        if let Some(v) = value {
            entry.push(v);
        }
    }

    fn finish(self, min_population: usize) -> Result<Vec<BenchmarkDistribution>, BenchmarkError> {
        let mut out = Vec::with_capacity(self.values.len());
        for (key, values) in self.values {
            if values.len() < min_population {
                debug!(
                    "Skipping {}: {} values below minimum {}",
                    key,
                    values.len(),
                    min_population
                );
                continue;
            }
            if let Some(dist) = summarize(key, values)? {
                out.push(dist);
            }
        }
        Ok(out)
    }
}

fn player_qualifies(metric: MetricId, sample: &PlayerSample<'_>, rules: &BenchmarkRules) -> bool {
    if sample.minutes < rules.min_player_minutes {
        return false;
    }
    if metric.is_shooting() && sample.fga < rules.min_player_fga {
        return false;
    }
    // Proxy usage is on a different scale and never mixes with the full formula.
    if metric == MetricId::UsgPct && sample.usage_basis != Some(UsageBasis::TeamNormalized) {
        return false;
    }
    true
}

/// Build all distributions for one season.
pub fn build_season(
    season: Season,
    team_rows: &[&MetricSet],
    players: &[PlayerSample<'_>],
    rules: &BenchmarkRules,
) -> Result<Vec<BenchmarkDistribution>, BenchmarkError> {
    if team_rows.is_empty() && players.is_empty() {
        return Err(BenchmarkError::EmptySeason(season));
    }
    let mut agg = Aggregator::default();

    for metric in TEAM_METRICS {
        let key = BenchmarkKey {
            season,
            scope: Scope::Team,
            metric,
            position: None,
        };
        for row in team_rows {
            agg.push(key, row.get(metric));
        }
    }

    for metric in PLAYER_METRICS {
        let all = BenchmarkKey {
            season,
            scope: Scope::Player,
            metric,
            position: None,
        };
        for sample in players.iter().filter(|s| player_qualifies(metric, s, rules)) {
            let value = sample.metrics.get(metric);
            agg.push(all, value);
            if PositionGroup::SCOPED.contains(&sample.position) {
                agg.push(
                    BenchmarkKey {
                        position: Some(sample.position),
                        ..all
                    },
                    value,
                );
            }
        }
    }

    agg.finish(rules.min_population)
}

/// Produce the next snapshot: the season's distributions are replaced
/// wholesale, everything else is carried over from `prior`.
pub fn rebuild_snapshot(
    prior: &BenchmarkSnapshot,
    season: Season,
    team_rows: &[&MetricSet],
    players: &[PlayerSample<'_>],
    rules: &BenchmarkRules,
    built_at: DateTime<Utc>,
) -> Result<BenchmarkSnapshot, BenchmarkError> {
    let rebuilt = build_season(season, team_rows, players, rules)?;
    info!(
        "Built {} distributions for season {} from {} team-games and {} player-games",
        rebuilt.len(),
        season,
        team_rows.len(),
        players.len()
    );

    let distributions: Vec<BenchmarkDistribution> = prior
        .iter()
        .filter(|d| d.key.season != season)
        .cloned()
        .chain(rebuilt)
        .collect();

    Ok(BenchmarkSnapshot::new(
        prior.version() + 1,
        Some(built_at),
        distributions,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_fixtures::benchmark::{distribution, team_key};
    use pretty_assertions::assert_eq;

    fn team_set(metric: MetricId, value: Option<f64>) -> MetricSet {
        let mut set = MetricSet::new();
        set.insert(metric, value);
        set
    }

    #[test]
    fn test_summarize_statistics() {
        let key = team_key(2025, MetricId::ORtg);
        let values: Vec<f64> = (1..=11).map(|v| v as f64).collect();
        let d = summarize(key, values).unwrap().unwrap();
        assert_eq!(d.n, 11);
        assert_eq!(d.mean, 6.0);
        assert_eq!(d.min, 1.0);
        assert_eq!(d.max, 11.0);
        assert_eq!(d.p10, 2.0);
        assert_eq!(d.p25, 3.5);
        assert_eq!(d.p50, 6.0);
        assert_eq!(d.p90, 10.0);
        assert!((d.std.unwrap() - 11.0f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_single_value_has_no_std() {
        let d = summarize(team_key(2025, MetricId::ORtg), vec![0.4]).unwrap().unwrap();
        assert_eq!(d.std, None);
        assert_eq!(d.p50, 0.4);
    }

    #[test]
    fn test_summarize_three_values_median() {
        let d = summarize(team_key(2025, MetricId::EfgPct), vec![0.5, 0.3, 0.4])
            .unwrap()
            .unwrap();
        assert_eq!(d.p50, 0.4);
        assert!((d.p10 - 0.32).abs() < 1e-12);
    }

    #[test]
    fn test_summarize_rejects_non_finite() {
        let err = summarize(team_key(2025, MetricId::ORtg), vec![1.0, f64::NAN]).unwrap_err();
        assert!(matches!(err, BenchmarkError::NonFinite { .. }));
    }

    #[test]
    fn test_build_season_skips_small_populations_and_missing() {
        let rows: Vec<MetricSet> = (0..12)
            .map(|i| {
                let mut set = team_set(MetricId::ORtg, Some(90.0 + i as f64));
                set.insert(MetricId::Fg3Pct, if i < 3 { Some(0.3) } else { None });
                set
            })
            .collect();
        let refs: Vec<&MetricSet> = rows.iter().collect();
        let dists = build_season(2025, &refs, &[], &BenchmarkRules::default()).unwrap();

        let ortg = dists.iter().find(|d| d.key.metric == MetricId::ORtg).unwrap();
        assert_eq!(ortg.n, 12);
        assert!(dists.iter().all(|d| d.key.metric != MetricId::Fg3Pct));
    }

    #[test]
    fn test_player_qualification_and_positions() {
        let good = team_set(MetricId::UsgPct, Some(20.0));
        let mut samples = Vec::new();
        for i in 0..12 {
            samples.push(PlayerSample {
                position: if i % 2 == 0 { PositionGroup::Guard } else { PositionGroup::Other },
                minutes: 25.0,
                fga: 2,
                usage_basis: Some(UsageBasis::TeamNormalized),
                metrics: &good,
            });
        }
        // below the minutes floor
        samples.push(PlayerSample {
            position: PositionGroup::Guard,
            minutes: 3.0,
            fga: 10,
            usage_basis: Some(UsageBasis::TeamNormalized),
            metrics: &good,
        });
        // proxy usage never enters the population
        samples.push(PlayerSample {
            position: PositionGroup::Guard,
            minutes: 30.0,
            fga: 10,
            usage_basis: Some(UsageBasis::PerMinuteProxy),
            metrics: &good,
        });

        let rules = BenchmarkRules {
            min_population: 6,
            ..BenchmarkRules::default()
        };
        let dists = build_season(2025, &[], &samples, &rules).unwrap();
        let all = dists
            .iter()
            .find(|d| d.key.metric == MetricId::UsgPct && d.key.position.is_none())
            .unwrap();
        assert_eq!(all.n, 12);
        let guards = dists
            .iter()
            .find(|d| d.key.position == Some(PositionGroup::Guard))
            .unwrap();
        assert_eq!(guards.n, 6);
        assert!(dists.iter().all(|d| d.key.position != Some(PositionGroup::Other)));
    }

    #[test]
    fn test_shooting_metrics_need_fga_floor() {
        let set = team_set(MetricId::TsPct, Some(0.55));
        let samples: Vec<PlayerSample> = (0..10)
            .map(|_| PlayerSample {
                position: PositionGroup::Forward,
                minutes: 30.0,
                fga: 2,
                usage_basis: None,
                metrics: &set,
            })
            .collect();
        let dists = build_season(2025, &[], &samples, &BenchmarkRules::default()).unwrap();
        assert!(dists.is_empty());
    }

    #[test]
    fn test_rebuild_snapshot_replaces_season_and_bumps_version() {
        let old_2024 = distribution(team_key(2024, MetricId::ORtg), 80.0, 5.0);
        let old_2025 = distribution(team_key(2025, MetricId::DRtg), 80.0, 5.0);
        let prior = BenchmarkSnapshot::new(4, None, vec![old_2024.clone(), old_2025]);

        let rows: Vec<MetricSet> = (0..10)
            .map(|i| team_set(MetricId::ORtg, Some(100.0 + i as f64)))
            .collect();
        let refs: Vec<&MetricSet> = rows.iter().collect();
        let now = Utc::now();
        let next =
            rebuild_snapshot(&prior, 2025, &refs, &[], &BenchmarkRules::default(), now).unwrap();

        assert_eq!(next.version(), 5);
        assert_eq!(next.built_at(), Some(now));
        assert_eq!(next.get(&old_2024.key), Some(&old_2024));
        assert!(next.get(&team_key(2025, MetricId::DRtg)).is_none());
        assert_eq!(next.get(&team_key(2025, MetricId::ORtg)).unwrap().n, 10);
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let rows: Vec<MetricSet> = [3.0, 1.0, 2.0, 5.0, 4.0, 9.0, 7.0, 8.0, 6.0, 10.0]
            .iter()
            .map(|v| team_set(MetricId::Pace, Some(*v)))
            .collect();
        let forward: Vec<&MetricSet> = rows.iter().collect();
        let reverse: Vec<&MetricSet> = rows.iter().rev().collect();
        let rules = BenchmarkRules::default();
        let a = build_season(2025, &forward, &[], &rules).unwrap();
        let b = build_season(2025, &reverse, &[], &rules).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_season_fails() {
        let err = build_season(2025, &[], &[], &BenchmarkRules::default()).unwrap_err();
        assert!(matches!(err, BenchmarkError::EmptySeason(2025)));
    }
}
