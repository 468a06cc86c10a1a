//! On/off attribution and lineup grouping over resolved stints.
//!
//! Unresolved stints are skipped entirely: a stretch where the on-court
//! set is unknown cannot be credited to anyone.

use std::collections::BTreeMap;

use crate::models::{
    Lineup, LineupStint, LineupSummary, OnOffSplit, PlayerId, Season, SplitTotals, TeamId,
};

fn add_stint(totals: &mut SplitTotals, stint: &LineupStint) {
    totals.seconds += stint.duration_secs();
    totals.points_for += stint.team.pts;
    totals.points_against += stint.opponent.pts;
    totals.possessions_for += stint.possessions;
    totals.possessions_against += stint.opponent_possessions;
}

fn subtract(total: &SplitTotals, part: &SplitTotals) -> SplitTotals {
    SplitTotals {
        seconds: (total.seconds - part.seconds).max(0.0),
        points_for: total.points_for.saturating_sub(part.points_for),
        points_against: total.points_against.saturating_sub(part.points_against),
        possessions_for: (total.possessions_for - part.possessions_for).max(0.0),
        possessions_against: (total.possessions_against - part.possessions_against).max(0.0),
    }
}

fn resolved(stints: &[LineupStint]) -> impl Iterator<Item = (&LineupStint, &Lineup)> {
    stints
        .iter()
        .filter_map(|s| s.status.lineup().map(|lineup| (s, lineup)))
}

/// Per player on-court and off-court team performance.
///
/// Off-court totals are the team's resolved totals minus the player's
/// on-court totals, so they cover the same resolved stretches only.
pub fn on_off_splits(season: Season, stints: &[LineupStint]) -> Vec<OnOffSplit> {
    let mut team_totals: BTreeMap<&TeamId, SplitTotals> = BTreeMap::new();
    let mut on_totals: BTreeMap<(&TeamId, &PlayerId), SplitTotals> = BTreeMap::new();

    for (stint, lineup) in resolved(stints) {
        add_stint(team_totals.entry(&stint.team_id).or_default(), stint);
        for player in lineup.players() {
            add_stint(on_totals.entry((&stint.team_id, player)).or_default(), stint);
        }
    }

    on_totals
        .into_iter()
        .map(|((team_id, player_id), on)| {
            let team = team_totals.get(team_id).copied().unwrap_or_default();
            let off = subtract(&team, &on);
            let on_net_rtg = on.net_rating();
            let off_net_rtg = off.net_rating();
            OnOffSplit {
                season,
                team_id: team_id.clone(),
                player_id: player_id.clone(),
                on,
                off,
                on_net_rtg,
                off_net_rtg,
                net_diff: on_net_rtg.zip(off_net_rtg).map(|(a, b)| a - b),
            }
        })
        .collect()
}

/// Aggregate resolved stints by team and canonical lineup key.
pub fn group_lineups(season: Season, stints: &[LineupStint]) -> Vec<LineupSummary> {
    let mut groups: BTreeMap<(&TeamId, String), (&Lineup, u32, SplitTotals)> = BTreeMap::new();

    for (stint, lineup) in resolved(stints) {
        let entry = groups
            .entry((&stint.team_id, lineup.key()))
            .or_insert((lineup, 0, SplitTotals::default()));
        entry.1 += 1;
        add_stint(&mut entry.2, stint);
    }

    groups
        .into_iter()
        .map(|((team_id, lineup_key), (lineup, count, totals))| LineupSummary {
            season,
            team_id: team_id.clone(),
            lineup_key,
            lineup: lineup.clone(),
            stints: count,
            ortg: totals.offensive_rating(),
            drtg: totals.defensive_rating(),
            net_rtg: totals.net_rating(),
            totals,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoxCounts, GameClock, GameId, StintStatus, UnresolvedReason};

    fn lineup(names: &[&str]) -> Lineup {
        Lineup::new(names.iter().map(|n| PlayerId::from(*n))).unwrap()
    }

    fn stint(start: u32, end: u32, status: StintStatus, pts_for: u32, pts_against: u32, poss: f64) -> LineupStint {
        LineupStint {
            game_id: GameId::from("g1"),
            team_id: TeamId::from("A"),
            sequence: 1,
            period: 1,
            start_clock: GameClock::from_secs(start),
            end_clock: GameClock::from_secs(end),
            status,
            team: BoxCounts {
                pts: pts_for,
                ..BoxCounts::default()
            },
            opponent: BoxCounts {
                pts: pts_against,
                ..BoxCounts::default()
            },
            possessions: poss,
            opponent_possessions: poss,
            event_count: 1,
        }
    }

    fn sample() -> Vec<LineupStint> {
        let starters = lineup(&["a1", "a2", "a3", "a4", "a5"]);
        let bench = lineup(&["a2", "a3", "a4", "a5", "a6"]);
        vec![
            stint(600, 300, StintStatus::Resolved { lineup: starters.clone() }, 12, 8, 10.0),
            stint(300, 200, StintStatus::Resolved { lineup: bench }, 2, 6, 4.0),
            stint(
                200,
                100,
                StintStatus::Unresolved {
                    reason: UnresolvedReason::ActorOffCourt,
                    known_players: vec![],
                },
                10,
                0,
                4.0,
            ),
            stint(100, 0, StintStatus::Resolved { lineup: starters }, 3, 3, 3.0),
        ]
    }

    #[test]
    fn test_on_off_splits() {
        let splits = on_off_splits(2025, &sample());
        let a1 = splits.iter().find(|s| s.player_id.as_str() == "a1").unwrap();
        assert_eq!(a1.on.seconds, 400.0);
        assert_eq!(a1.on.points_for, 15);
        assert_eq!(a1.on.points_against, 11);
        assert_eq!(a1.off.seconds, 100.0);
        assert_eq!(a1.off.points_for, 2);
        assert!((a1.on_net_rtg.unwrap() - 400.0 / 13.0).abs() < 1e-9);
        assert_eq!(a1.off_net_rtg, Some(-100.0));

        // unresolved points never show up
        let a2 = splits.iter().find(|s| s.player_id.as_str() == "a2").unwrap();
        assert_eq!(a2.on.points_for, 17);
        assert_eq!(a2.off.seconds, 0.0);
        assert_eq!(a2.off_net_rtg, None);
        assert_eq!(a2.net_diff, None);
        assert_eq!(splits.len(), 6);
    }

    #[test]
    fn test_group_lineups() {
        let groups = group_lineups(2025, &sample());
        assert_eq!(groups.len(), 2);
        let starters = groups.iter().find(|g| g.lineup_key == "a1-a2-a3-a4-a5").unwrap();
        assert_eq!(starters.stints, 2);
        assert_eq!(starters.totals.points_for, 15);
        assert_eq!(starters.totals.seconds, 400.0);
        assert_eq!(starters.ortg, Some(100.0 * 15.0 / 13.0));
    }
}
