//! Output row assembly.

use std::collections::BTreeMap;

use super::labels::{self, LabelRules};
use super::metrics::PlayerMetrics;
use super::percentile::rank_metric;
use super::rolling::RollingContext;
use crate::models::{
    player_record_key, team_record_key, BenchmarkSnapshot, GameRecord, MetricId, MetricSet,
    PlayerGameRecord, PlayerGameRow, RankOutcome, Scope, Season, TeamGameRow, UsageBasis,
    PLAYER_METRICS, TEAM_METRICS,
};

/// Ranks metric values against one frozen snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Ranker<'a> {
    snapshot: &'a BenchmarkSnapshot,
    reference_season: Option<Season>,
}

impl<'a> Ranker<'a> {
    /// With `reference_season` set every lookup uses that season's
    /// distributions instead of the game's own season.
    pub fn new(snapshot: &'a BenchmarkSnapshot, reference_season: Option<Season>) -> Self {
        Self {
            snapshot,
            reference_season,
        }
    }

    pub fn version(&self) -> u64 {
        self.snapshot.version()
    }

    fn season(&self, season: Season) -> Season {
        self.reference_season.unwrap_or(season)
    }

    pub fn rank_team(&self, season: Season, metrics: &MetricSet) -> BTreeMap<MetricId, RankOutcome> {
        let season = self.season(season);
        TEAM_METRICS
            .iter()
            .map(|&metric| {
                let outcome = rank_metric(
                    self.snapshot,
                    season,
                    Scope::Team,
                    metric,
                    None,
                    metrics.get(metric),
                );
                (metric, outcome)
            })
            .collect()
    }

    pub fn rank_player(
        &self,
        player: &PlayerGameRecord,
        computed: &PlayerMetrics,
    ) -> BTreeMap<MetricId, RankOutcome> {
        let season = self.season(player.season);
        PLAYER_METRICS
            .iter()
            .map(|&metric| {
                // Benchmarks only hold team-normalized usage.
                if metric == MetricId::UsgPct
                    && computed.usage_basis == Some(UsageBasis::PerMinuteProxy)
                {
                    return (metric, RankOutcome::NoBenchmark);
                }
                let outcome = rank_metric(
                    self.snapshot,
                    season,
                    Scope::Player,
                    metric,
                    Some(player.position),
                    computed.metrics.get(metric),
                );
                (metric, outcome)
            })
            .collect()
    }
}

/// Display colors for every ranked metric. Missing and unbenchmarked
/// metrics have no color.
pub fn tier_colors(ranks: &BTreeMap<MetricId, RankOutcome>) -> BTreeMap<MetricId, String> {
    ranks
        .iter()
        .filter_map(|(metric, outcome)| outcome.tier().map(|t| (*metric, t.color().to_string())))
        .collect()
}

/// Build one team-game row. `opponent_ranks` are the other side's ranks for
/// the same game and only feed why-team-won.
pub fn team_row(
    record: &GameRecord,
    metrics: MetricSet,
    rolling: RollingContext,
    ranks: BTreeMap<MetricId, RankOutcome>,
    opponent_ranks: &BTreeMap<MetricId, RankOutcome>,
    rules: &LabelRules,
    benchmark_version: u64,
) -> TeamGameRow {
    let (team, opponent) = (&record.team, &record.opponent);
    let won = record.won();
    let margin = record.margin();

    let game_context = if won {
        labels::game_context(team.ap_rank, opponent.ap_rank, margin, rules)
    } else {
        labels::game_context(opponent.ap_rank, team.ap_rank, margin, rules)
    };
    let why_won = if won {
        labels::why_won(&ranks, opponent_ranks, rules)
    } else {
        Vec::new()
    };

    TeamGameRow {
        record_key: team_record_key(team.season, &team.game_id, &team.team_id),
        season: team.season,
        game_id: team.game_id.clone(),
        game_date: team.game_date,
        team_id: team.team_id.clone(),
        team_name: team.team_name.clone(),
        opponent_id: opponent.team_id.clone(),
        home: team.home,
        points: team.counts.pts,
        opponent_points: opponent.counts.pts,
        margin,
        won,
        metrics,
        rolling: rolling.values,
        rolling_games: rolling.games,
        tier_colors: tier_colors(&ranks),
        ranks,
        game_context,
        why_won,
        benchmark_version,
    }
}

/// Build one player-game row. DNQ players carry ranks but no role.
pub fn player_row(
    player: &PlayerGameRecord,
    computed: PlayerMetrics,
    ranks: BTreeMap<MetricId, RankOutcome>,
    benchmark_version: u64,
) -> PlayerGameRow {
    let role = if computed.dnq {
        None
    } else {
        labels::player_role(&ranks)
    };

    PlayerGameRow {
        record_key: player_record_key(
            player.season,
            &player.game_id,
            &player.team_id,
            &player.player_id,
        ),
        season: player.season,
        game_id: player.game_id.clone(),
        team_id: player.team_id.clone(),
        player_id: player.player_id.clone(),
        player_name: player.player_name.clone(),
        position: player.position,
        starter: player.starter,
        minutes: player.minutes,
        dnq: computed.dnq,
        usage_basis: computed.usage_basis,
        metrics: computed.metrics,
        tier_colors: tier_colors(&ranks),
        ranks,
        role,
        role_color: role.map(|r| r.color().to_string()),
        benchmark_version,
    }
}
