//! Percentile ranking against benchmark distributions.

use tracing::trace;

use super::CalcError;
use crate::models::{
    BenchmarkDistribution, BenchmarkKey, BenchmarkSnapshot, MetricId, PositionGroup, RankOutcome,
    Scope, Season, Tier,
};

/// Position of `value` within a distribution, on a 0-100 scale.
///
/// Piecewise-linear through (min,0) (p10,10) (p25,25) (p50,50) (p75,75)
/// (p90,90) (max,100). Values outside [min, max] clamp to 0 or 100. A
/// value equal to a run of tied anchors gets the midpoint of the run.
pub fn percentile_of(value: f64, dist: &BenchmarkDistribution) -> f64 {
    let anchors = dist.anchors();

    let mut tied = anchors.iter().filter(|(v, _)| *v == value);
    if let Some(&(_, first)) = tied.next() {
        let last = tied.last().map(|&(_, p)| p).unwrap_or(first);
        return (first + last) / 2.0;
    }

    if value < anchors[0].0 {
        return 0.0;
    }
    if value > anchors[anchors.len() - 1].0 {
        return 100.0;
    }

    for pair in anchors.windows(2) {
        let ((lo_v, lo_p), (hi_v, hi_p)) = (pair[0], pair[1]);
        if lo_v < value && value < hi_v {
            let p = lo_p + (value - lo_v) / (hi_v - lo_v) * (hi_p - lo_p);
            return p.clamp(0.0, 100.0);
        }
    }

    // Only reachable for NaN or anchors that are out of order.
    50.0
}

/// Orient a raw percentile so that higher is always better.
pub fn label_percentile(metric: MetricId, raw_percentile: f64) -> f64 {
    if metric.lower_is_better() {
        100.0 - raw_percentile
    } else {
        raw_percentile
    }
}

/// Find the distribution for a lookup. Player lookups with a position
/// fall back to the all-positions distribution.
pub fn find_distribution(
    snapshot: &BenchmarkSnapshot,
    season: Season,
    scope: Scope,
    metric: MetricId,
    position: Option<PositionGroup>,
) -> Result<&BenchmarkDistribution, CalcError> {
    let key = BenchmarkKey {
        season,
        scope,
        metric,
        position,
    };
    snapshot
        .get(&key)
        .or_else(|| {
            position.and_then(|_| {
                snapshot.get(&BenchmarkKey {
                    position: None,
                    ..key
                })
            })
        })
        .ok_or(CalcError::StaleBenchmark { metric, season })
}

/// Rank one metric value. Missing values and missing benchmarks are
/// reported as such rather than failing the row.
pub fn rank_metric(
    snapshot: &BenchmarkSnapshot,
    season: Season,
    scope: Scope,
    metric: MetricId,
    position: Option<PositionGroup>,
    value: Option<f64>,
) -> RankOutcome {
    let Some(raw) = value else {
        return RankOutcome::Missing;
    };
    match find_distribution(snapshot, season, scope, metric, position) {
        Ok(dist) => {
            let raw_percentile = percentile_of(raw, dist);
            let percentile = label_percentile(metric, raw_percentile);
            RankOutcome::Ranked {
                raw,
                raw_percentile,
                percentile,
                tier: Tier::from_percentile(percentile),
            }
        }
        Err(e) => {
            trace!("{}", e);
            RankOutcome::NoBenchmark
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_fixtures::benchmark::{distribution, team_key};

    fn dist() -> BenchmarkDistribution {
        // min 0, p10 10, p25 20, p50 30, p75 40, p90 50, max 60
        distribution(team_key(2025, MetricId::ORtg), 0.0, 10.0)
    }

    #[test]
    fn test_percentile_at_anchors() {
        let d = dist();
        assert_eq!(percentile_of(0.0, &d), 0.0);
        assert_eq!(percentile_of(10.0, &d), 10.0);
        assert_eq!(percentile_of(30.0, &d), 50.0);
        assert_eq!(percentile_of(60.0, &d), 100.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let d = dist();
        assert_eq!(percentile_of(5.0, &d), 5.0);
        assert_eq!(percentile_of(15.0, &d), 17.5);
        assert_eq!(percentile_of(55.0, &d), 95.0);
    }

    #[test]
    fn test_percentile_clamps() {
        let d = dist();
        assert_eq!(percentile_of(-5.0, &d), 0.0);
        assert_eq!(percentile_of(600.0, &d), 100.0);
    }

    #[test]
    fn test_percentile_tied_anchors_midpoint() {
        let mut d = dist();
        d.p25 = 30.0; // p25 == p50 == 30
        assert_eq!(percentile_of(30.0, &d), 37.5);
        d.min = 0.0;
        d.p10 = 0.0;
        assert_eq!(percentile_of(0.0, &d), 5.0);
    }

    #[test]
    fn test_population_median_is_fifty() {
        let mut d = dist();
        d.min = 0.30;
        d.p10 = 0.32;
        d.p25 = 0.35;
        d.p50 = 0.40;
        d.p75 = 0.45;
        d.p90 = 0.48;
        d.max = 0.50;
        assert_eq!(percentile_of(0.40, &d), 50.0);
    }

    #[test]
    fn test_label_percentile_inverts_lower_is_better() {
        assert_eq!(label_percentile(MetricId::TovPct, 80.0), 20.0);
        assert_eq!(label_percentile(MetricId::DRtg, 10.0), 90.0);
        assert_eq!(label_percentile(MetricId::ORtg, 80.0), 80.0);
    }

    #[test]
    fn test_rank_metric_outcomes() {
        let snapshot = BenchmarkSnapshot::new(1, None, vec![dist()]);
        let ranked = rank_metric(&snapshot, 2025, Scope::Team, MetricId::ORtg, None, Some(55.0));
        assert_eq!(ranked.tier(), Some(Tier::Elite));

        let missing = rank_metric(&snapshot, 2025, Scope::Team, MetricId::ORtg, None, None);
        assert_eq!(missing, RankOutcome::Missing);

        let stale = rank_metric(&snapshot, 2024, Scope::Team, MetricId::ORtg, None, Some(55.0));
        assert_eq!(stale, RankOutcome::NoBenchmark);
    }

    #[test]
    fn test_offensive_rebound_rate_ranks_against_built_population() {
        use crate::calculate::benchmark::summarize;
        use crate::calculate::metrics::team_metrics;
        use crate::models::BoxCounts;

        let team = BoxCounts {
            orb: 15,
            ..BoxCounts::default()
        };
        let opponent = BoxCounts {
            drb: 20,
            ..BoxCounts::default()
        };
        let oreb = team_metrics(&team, &opponent).get(MetricId::OrebPct).unwrap();
        assert!((oreb - 0.4286).abs() < 1e-4);

        let key = team_key(2025, MetricId::OrebPct);
        let d = summarize(key, vec![0.50, 0.30, 0.40]).unwrap().unwrap();
        assert_eq!(d.p50, 0.40);
        assert_eq!(percentile_of(0.40, &d), 50.0);

        // 15/35 sits between p50 (0.40) and p75 (0.45)
        let p = percentile_of(oreb, &d);
        assert!((p - (50.0 + (15.0 / 35.0 - 0.40) / 0.05 * 25.0)).abs() < 1e-9);
    }

    #[test]
    fn test_turnover_rate_at_p10_labels_near_ninety() {
        use crate::calculate::benchmark::summarize;

        let values: Vec<f64> = (10..=20).map(|i| i as f64 / 100.0).collect();
        let d = summarize(team_key(2025, MetricId::TovPct), values).unwrap().unwrap();
        let p10 = d.p10;
        let snapshot = BenchmarkSnapshot::new(1, None, vec![d]);

        let outcome = rank_metric(&snapshot, 2025, Scope::Team, MetricId::TovPct, None, Some(p10));
        match outcome {
            RankOutcome::Ranked {
                raw_percentile,
                percentile,
                tier,
                ..
            } => {
                assert!((raw_percentile - 10.0).abs() < 1e-9);
                assert!((percentile - 90.0).abs() < 1e-9);
                assert_eq!(tier, Tier::Elite);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_find_distribution_falls_back_to_all_positions() {
        let key = BenchmarkKey {
            season: 2025,
            scope: Scope::Player,
            metric: MetricId::UsgPct,
            position: None,
        };
        let snapshot = BenchmarkSnapshot::new(1, None, vec![distribution(key, 10.0, 3.0)]);
        let found = find_distribution(
            &snapshot,
            2025,
            Scope::Player,
            MetricId::UsgPct,
            Some(PositionGroup::Center),
        )
        .unwrap();
        assert_eq!(found.key.position, None);

        let err = find_distribution(&snapshot, 2025, Scope::Player, MetricId::TsPct, None).unwrap_err();
        assert!(matches!(err, CalcError::StaleBenchmark { metric: MetricId::TsPct, season: 2025 }));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Percentile is within [0,100] and non-decreasing in value.
            #[test]
            fn prop_percentile_monotonic(
                anchors in proptest::collection::vec(-50.0f64..50.0, 7),
                a in -80.0f64..80.0,
                b in -80.0f64..80.0,
            ) {
                let mut anchors = anchors;
                anchors.sort_by(|x, y| x.total_cmp(y));
                let mut d = dist();
                d.min = anchors[0];
                d.p10 = anchors[1];
                d.p25 = anchors[2];
                d.p50 = anchors[3];
                d.p75 = anchors[4];
                d.p90 = anchors[5];
                d.max = anchors[6];
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                let p_lo = percentile_of(lo, &d);
                let p_hi = percentile_of(hi, &d);
                prop_assert!((0.0..=100.0).contains(&p_lo));
                prop_assert!((0.0..=100.0).contains(&p_hi));
                prop_assert!(p_lo <= p_hi + 1e-9);
            }
        }
    }
}
