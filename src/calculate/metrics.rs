//! Box-score rate and efficiency metrics.
//!
//! Percentages are fractions (0.512), ratings are per 100 possessions and
//! usage is on a 0-100 scale. Any zero denominator yields `None`.

use crate::models::{
    BoxCounts, MetricId, MetricSet, PlayerGameRecord, TeamBox, TeamSide, UsageBasis,
};

/// Free-throw weight in the possession and true-shooting formulas.
pub const FTA_WEIGHT: f64 = 0.44;

/// Players under this many minutes are flagged `dnq`.
pub const DNQ_MINUTES: f64 = 5.0;

/// Estimate possessions from one side's own counts:
/// `FGA + 0.44·FTA − ORB + TOV`, floored at zero.
pub fn possessions(counts: &BoxCounts) -> f64 {
    let poss = counts.fga as f64 + FTA_WEIGHT * counts.fta as f64 - counts.orb as f64
        + counts.tov as f64;
    poss.max(0.0)
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator > 0.0).then(|| numerator / denominator)
}

fn efg(c: &BoxCounts) -> Option<f64> {
    ratio(c.fgm as f64 + 0.5 * c.fg3m as f64, c.fga as f64)
}

fn true_shooting(c: &BoxCounts) -> Option<f64> {
    ratio(
        c.pts as f64,
        2.0 * (c.fga as f64 + FTA_WEIGHT * c.fta as f64),
    )
}

/// Metrics shared by team and player rows.
fn shooting_metrics(c: &BoxCounts, set: &mut MetricSet) {
    set.insert(MetricId::EfgPct, efg(c));
    set.insert(MetricId::TsPct, true_shooting(c));
    set.insert(MetricId::FgPct, ratio(c.fgm as f64, c.fga as f64));
    set.insert(MetricId::Fg3Pct, ratio(c.fg3m as f64, c.fg3a as f64));
    set.insert(MetricId::FtPct, ratio(c.ftm as f64, c.fta as f64));
    set.insert(MetricId::Fg3Rate, ratio(c.fg3a as f64, c.fga as f64));
    set.insert(MetricId::Ftr, ratio(c.fta as f64, c.fga as f64));
    set.insert(MetricId::AstTov, ratio(c.ast as f64, c.tov as f64));
}

/// Compute every team metric for one side of a game.
///
/// Each side's possessions come from its own counts; the opponent's are
/// estimated independently, so the two need not match.
pub fn team_metrics(team: &TeamBox, opponent: &TeamBox) -> MetricSet {
    let mut set = MetricSet::new();
    let poss = possessions(team);
    let opp_poss = possessions(opponent);

    set.insert(MetricId::Possessions, Some(poss));
    set.insert(MetricId::Pace, Some(poss));

    shooting_metrics(team, &mut set);
    set.insert(
        MetricId::Fg2Pct,
        ratio(
            team.fgm.saturating_sub(team.fg3m) as f64,
            team.fga.saturating_sub(team.fg3a) as f64,
        ),
    );

    set.insert(MetricId::TovPct, ratio(team.tov as f64, poss));
    set.insert(
        MetricId::OrebPct,
        ratio(team.orb as f64, (team.orb + opponent.drb) as f64),
    );
    set.insert(
        MetricId::DrebPct,
        ratio(team.drb as f64, (team.drb + opponent.orb) as f64),
    );
    set.insert(MetricId::AstPct, ratio(team.ast as f64, team.fgm as f64));
    set.insert(MetricId::StlPct, ratio(team.stl as f64, opp_poss));
    set.insert(MetricId::BlkPct, ratio(team.blk as f64, opponent.fga as f64));

    let ortg = ratio(100.0 * team.pts as f64, poss);
    let drtg = ratio(100.0 * opponent.pts as f64, opp_poss);
    set.insert(MetricId::ORtg, ortg);
    set.insert(MetricId::DRtg, drtg);
    set.insert(MetricId::NetRtg, ortg.zip(drtg).map(|(o, d)| o - d));

    set
}

/// Team aggregates needed for the full usage and assist formulas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamUsageContext {
    pub minutes: f64,
    pub fgm: u32,
    pub fga: u32,
    pub fta: u32,
    pub tov: u32,
}

impl From<&TeamSide> for TeamUsageContext {
    fn from(side: &TeamSide) -> Self {
        Self {
            minutes: side.minutes,
            fgm: side.counts.fgm,
            fga: side.counts.fga,
            fta: side.counts.fta,
            tov: side.counts.tov,
        }
    }
}

/// Player metrics plus the flags that travel with them.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerMetrics {
    pub metrics: MetricSet,
    pub usage_basis: Option<UsageBasis>,
    pub dnq: bool,
}

fn possessions_used(c: &BoxCounts) -> f64 {
    c.fga as f64 + FTA_WEIGHT * c.fta as f64 + c.tov as f64
}

/// USG% and the formula that produced it.
fn usage(
    player: &PlayerGameRecord,
    team: Option<&TeamUsageContext>,
) -> (Option<f64>, Option<UsageBasis>) {
    let used = possessions_used(&player.counts);
    match team {
        Some(team) => {
            let team_used =
                team.fga as f64 + FTA_WEIGHT * team.fta as f64 + team.tov as f64;
            let value = ratio(
                100.0 * used * (team.minutes / 5.0),
                player.minutes * team_used,
            );
            (value, value.map(|_| UsageBasis::TeamNormalized))
        }
        None => {
            let value = ratio(used, player.minutes).map(|per_min| per_min * 5.0);
            (value, value.map(|_| UsageBasis::PerMinuteProxy))
        }
    }
}

/// Share of teammate field goals a player assisted while on the floor.
fn assist_pct(player: &PlayerGameRecord, team: &TeamUsageContext) -> Option<f64> {
    let share = ratio(player.minutes, team.minutes / 5.0)?;
    let teammate_fgm = share * team.fgm as f64 - player.counts.fgm as f64;
    ratio(player.counts.ast as f64, teammate_fgm)
}

/// Compute every player metric for one player-game.
///
/// With `team` present USG% uses the full team-normalized formula,
/// otherwise the per-minute proxy; the row records which.
pub fn player_metrics(
    player: &PlayerGameRecord,
    team: Option<&TeamUsageContext>,
) -> PlayerMetrics {
    let c = &player.counts;
    let mut set = MetricSet::new();

    shooting_metrics(c, &mut set);

    let (usg, usage_basis) = usage(player, team);
    set.insert(MetricId::UsgPct, usg);
    set.insert(
        MetricId::AstPct,
        team.and_then(|team| assist_pct(player, team)),
    );
    set.insert(
        MetricId::PlayerTovPct,
        ratio(c.tov as f64, possessions_used(c)),
    );

    let per_40 = |stat: u32| ratio(stat as f64 * 40.0, player.minutes);
    set.insert(MetricId::PtsPer40, per_40(c.pts));
    set.insert(MetricId::RebPer40, per_40(c.rebounds()));
    set.insert(MetricId::AstPer40, per_40(c.ast));
    set.insert(MetricId::StlPer40, per_40(c.stl));
    set.insert(MetricId::BlkPer40, per_40(c.blk));
    set.insert(MetricId::TovPer40, per_40(c.tov));

    PlayerMetrics {
        metrics: set,
        usage_basis,
        dnq: player.minutes < DNQ_MINUTES,
    }
}
