//! Last-N rolling context per team.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::models::{GameId, MetricSet, TeamId, ROLLING_METRICS};

/// Default number of prior games in the window.
pub const DEFAULT_WINDOW: usize = 5;

/// One team-game's metrics, as seen by the rolling engine.
#[derive(Debug, Clone, Copy)]
pub struct GameMetrics<'a> {
    pub team_id: &'a TeamId,
    pub game_date: NaiveDate,
    pub game_id: &'a GameId,
    pub metrics: &'a MetricSet,
}

/// Rolling values for one team-game.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollingContext {
    pub values: MetricSet,

    /// Number of strictly prior games in the window
    pub games: u32,
}

/// Compute last-N context for every game, returned in input order.
///
/// Each team's history is ordered by (date, game id). The value for a
/// game is the unweighted mean of the non-missing values among the
/// `window` most recent strictly-prior games. No prior games, or no
/// non-missing value among them, gives a missing value.
pub fn rolling_context(games: &[GameMetrics<'_>], window: usize) -> Vec<RollingContext> {
    let mut by_team: BTreeMap<&TeamId, Vec<usize>> = BTreeMap::new();
    for (i, game) in games.iter().enumerate() {
        by_team.entry(game.team_id).or_default().push(i);
    }

    let mut out = vec![RollingContext::default(); games.len()];
    for (_, mut indices) in by_team {
        indices.sort_by(|&a, &b| {
            (games[a].game_date, games[a].game_id).cmp(&(games[b].game_date, games[b].game_id))
        });

        for (pos, &idx) in indices.iter().enumerate() {
            let prior = &indices[pos.saturating_sub(window)..pos];
            let mut values = MetricSet::new();
            for metric in ROLLING_METRICS {
                let present: Vec<f64> = prior
                    .iter()
                    .filter_map(|&j| games[j].metrics.get(metric))
                    .collect();
                let mean = (!present.is_empty())
                    .then(|| present.iter().sum::<f64>() / present.len() as f64);
                values.insert(metric, mean);
            }
            out[idx] = RollingContext {
                values,
                games: prior.len() as u32,
            };
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricId;

    fn metrics(ortg: Option<f64>) -> MetricSet {
        let mut set = MetricSet::new();
        set.insert(MetricId::ORtg, ortg);
        set
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    #[test]
    fn test_rolling_excludes_current_game() {
        let team = TeamId::from("A");
        let ids: Vec<GameId> = (1..=7).map(|i| GameId::from(format!("g{}", i))).collect();
        let sets: Vec<MetricSet> = (1..=7).map(|i| metrics(Some(i as f64 * 10.0))).collect();
        // input deliberately out of date order
        let order = [6usize, 0, 3, 1, 5, 2, 4];
        let games: Vec<GameMetrics> = order
            .iter()
            .map(|&i| GameMetrics {
                team_id: &team,
                game_date: date(i as u32 + 1),
                game_id: &ids[i],
                metrics: &sets[i],
            })
            .collect();

        let ctx = rolling_context(&games, 5);
        // game 1 (input position 1): no prior games
        assert_eq!(ctx[1].games, 0);
        assert_eq!(ctx[1].values.get(MetricId::ORtg), None);
        // game 2 (position 3): mean of game 1
        assert_eq!(ctx[3].values.get(MetricId::ORtg), Some(10.0));
        // game 7 (position 0): mean of games 2..=6
        assert_eq!(ctx[0].games, 5);
        assert_eq!(ctx[0].values.get(MetricId::ORtg), Some(40.0));
    }

    #[test]
    fn test_sixth_game_is_mean_of_first_five() {
        let team = TeamId::from("A");
        let ids: Vec<GameId> = (1..=6).map(|i| GameId::from(format!("g{}", i))).collect();
        let sets: Vec<MetricSet> = [98.0, 104.0, 110.0, 95.0, 113.0, 120.0]
            .iter()
            .map(|v| metrics(Some(*v)))
            .collect();
        let games: Vec<GameMetrics> = (0..6)
            .map(|i| GameMetrics {
                team_id: &team,
                game_date: date(i as u32 + 1),
                game_id: &ids[i],
                metrics: &sets[i],
            })
            .collect();

        let ctx = rolling_context(&games, DEFAULT_WINDOW);
        assert_eq!(ctx[0].values.get(MetricId::ORtg), None);
        assert_eq!(ctx[5].games, 5);
        let mean = (98.0 + 104.0 + 110.0 + 95.0 + 113.0) / 5.0;
        assert!((ctx[5].values.get(MetricId::ORtg).unwrap() - mean).abs() < 1e-9);
    }

    #[test]
    fn test_rolling_skips_missing_values() {
        let team = TeamId::from("A");
        let ids: Vec<GameId> = (1..=3).map(|i| GameId::from(format!("g{}", i))).collect();
        let sets = vec![metrics(Some(100.0)), metrics(None), metrics(Some(90.0))];
        let games: Vec<GameMetrics> = (0..3)
            .map(|i| GameMetrics {
                team_id: &team,
                game_date: date(i as u32 + 1),
                game_id: &ids[i],
                metrics: &sets[i],
            })
            .collect();
        let ctx = rolling_context(&games, 5);
        assert_eq!(ctx[2].values.get(MetricId::ORtg), Some(100.0));
        assert_eq!(ctx[2].games, 2);
        assert_eq!(ctx[1].values.get(MetricId::ORtg), Some(100.0));
    }

    #[test]
    fn test_rolling_all_missing_is_missing() {
        let team = TeamId::from("A");
        let ids = [GameId::from("g1"), GameId::from("g2")];
        let sets = [metrics(None), metrics(None)];
        let games: Vec<GameMetrics> = (0..2)
            .map(|i| GameMetrics {
                team_id: &team,
                game_date: date(i as u32 + 1),
                game_id: &ids[i],
                metrics: &sets[i],
            })
            .collect();
        let ctx = rolling_context(&games, 5);
        assert_eq!(ctx[1].values.get(MetricId::ORtg), None);
        assert!(ctx[1].values.contains(MetricId::DRtg));
    }

    #[test]
    fn test_rolling_teams_are_independent() {
        let (a, b) = (TeamId::from("A"), TeamId::from("B"));
        let ids = [GameId::from("g1"), GameId::from("g2")];
        let sets = [metrics(Some(80.0)), metrics(Some(120.0))];
        let games = vec![
            GameMetrics {
                team_id: &a,
                game_date: date(1),
                game_id: &ids[0],
                metrics: &sets[0],
            },
            GameMetrics {
                team_id: &b,
                game_date: date(2),
                game_id: &ids[1],
                metrics: &sets[1],
            },
        ];
        let ctx = rolling_context(&games, 5);
        assert_eq!(ctx[1].games, 0);
    }

    #[test]
    fn test_same_date_ordered_by_game_id() {
        let team = TeamId::from("A");
        let ids = [GameId::from("g2"), GameId::from("g1")];
        let sets = [metrics(Some(50.0)), metrics(Some(70.0))];
        let games: Vec<GameMetrics> = (0..2)
            .map(|i| GameMetrics {
                team_id: &team,
                game_date: date(3),
                game_id: &ids[i],
                metrics: &sets[i],
            })
            .collect();
        let ctx = rolling_context(&games, 5);
        assert_eq!(ctx[0].values.get(MetricId::ORtg), Some(70.0));
        assert_eq!(ctx[1].games, 0);
    }
}
