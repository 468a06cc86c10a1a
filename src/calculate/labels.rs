//! Categorical labels: game context, why-team-won and player role.

use std::collections::BTreeMap;

use crate::models::{GameContext, MarginContext, MetricId, PlayerRole, RankOutcome, WinDriver};

/// Highest AP rank that counts as ranked.
const MAX_AP_RANK: u8 = 25;

/// Metrics considered for why-team-won, in tie-break priority order.
pub const WHY_WON_PRIORITY: [MetricId; 6] = [
    MetricId::EfgPct,
    MetricId::TovPct,
    MetricId::OrebPct,
    MetricId::Ftr,
    MetricId::Fg3Pct,
    MetricId::AstPct,
];

/// Thresholds for the label engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelRules {
    pub why_won_threshold: f64,
    pub why_won_max: usize,
    pub blowout_margin: u32,
    pub close_margin: u32,
    pub upset_rank_diff: u8,
}

impl Default for LabelRules {
    fn default() -> Self {
        Self {
            why_won_threshold: 15.0,
            why_won_max: 3,
            blowout_margin: 20,
            close_margin: 5,
            upset_rank_diff: 10,
        }
    }
}

pub fn margin_context(margin: i64, rules: &LabelRules) -> MarginContext {
    let margin = margin.unsigned_abs();
    if margin >= u64::from(rules.blowout_margin) {
        MarginContext::Blowout
    } else if margin <= u64::from(rules.close_margin) {
        MarginContext::CloseGame
    } else {
        MarginContext::Comfortable
    }
}

/// Context for a game, from the winner's point of view.
///
/// With both teams ranked, the winner sitting `upset_rank_diff` or more
/// places below the loser is an upset; otherwise it is a showdown.
pub fn game_context(
    winner_rank: Option<u8>,
    loser_rank: Option<u8>,
    margin: i64,
    rules: &LabelRules,
) -> GameContext {
    let margin = margin_context(margin, rules);
    let ranked = |rank: Option<u8>| rank.filter(|r| (1..=MAX_AP_RANK).contains(r));

    match (ranked(winner_rank), ranked(loser_rank)) {
        (Some(w), Some(l)) if w >= l.saturating_add(rules.upset_rank_diff) => GameContext::Upset,
        (Some(_), Some(_)) => GameContext::RankedShowdown {
            close: margin == MarginContext::CloseGame,
        },
        (None, Some(_)) => GameContext::Upset,
        (Some(_), None) => GameContext::RankedMatchup { margin },
        (None, None) => GameContext::Unranked { margin },
    }
}

/// Reasons the winner won, strongest first.
///
/// Differentials compare label percentiles, so lower-is-better metrics are
/// already oriented. Metrics missing a percentile on either side are
/// skipped.
pub fn why_won(
    team: &BTreeMap<MetricId, RankOutcome>,
    opponent: &BTreeMap<MetricId, RankOutcome>,
    rules: &LabelRules,
) -> Vec<WinDriver> {
    let mut drivers: Vec<(usize, WinDriver)> = WHY_WON_PRIORITY
        .iter()
        .enumerate()
        .filter_map(|(priority, &metric)| {
            let ours = team.get(&metric)?.percentile()?;
            let theirs = opponent.get(&metric)?.percentile()?;
            let differential = ours - theirs;
            (differential >= rules.why_won_threshold).then_some((
                priority,
                WinDriver {
                    metric,
                    differential,
                },
            ))
        })
        .collect();

    drivers.sort_by(|(pa, a), (pb, b)| {
        b.differential
            .total_cmp(&a.differential)
            .then_with(|| pa.cmp(pb))
    });
    drivers
        .into_iter()
        .take(rules.why_won_max)
        .map(|(_, driver)| driver)
        .collect()
}

/// Role from usage and true-shooting ranks; `None` unless both ranked.
pub fn player_role(ranks: &BTreeMap<MetricId, RankOutcome>) -> Option<PlayerRole> {
    let usg = ranks.get(&MetricId::UsgPct)?.percentile()?;
    let ts = ranks.get(&MetricId::TsPct)?.percentile()?;
    Some(PlayerRole::from_percentiles(usg, ts))
}
