//! Single-pass batch derivation for one season.
//!
//! validate → pair → team metrics → player metrics → play-by-play (order
//! check, lineups, zones, play context) → on/off → rolling → benchmark rebuild → freeze
//! snapshot → rank and label → assemble.
//!
//! Per-game work fans out on the rayon pool. Nothing in a run shares
//! mutable state; per-record failures are collected as rejections and
//! never abort the batch.

use chrono::Utc;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::calculate::assemble::{player_row, team_row, Ranker};
use crate::calculate::benchmark::{rebuild_snapshot, PlayerSample};
use crate::calculate::lineup::reconstruct_game;
use crate::calculate::metrics::{player_metrics, team_metrics, PlayerMetrics, TeamUsageContext};
use crate::calculate::on_off::{group_lineups, on_off_splits};
use crate::calculate::play_context::{play_context, PlayClassifier};
use crate::calculate::rolling::{rolling_context, GameMetrics};
use crate::calculate::validate::{check_event_order, events_by_game, pair_team_games};
use crate::calculate::zones::{aggregate_zones, ZoneClassifier};
use crate::calculate::CalcError;
use crate::config::AppConfig;
use crate::models::{
    BenchmarkSnapshot, GameId, GameRecord, LineupStint, LineupSummary, MetricSet, OnOffSplit,
    PlayByPlayEvent, PlayContext, PlayerGameRecord, PlayerGameRow, PlayerId, RawPlayerGame, RawTeamGame,
    RejectedKind, Rejection, Season, TeamGameRow, TeamId, ZoneShot,
};
use crate::storage::benchmark_store::BenchmarkStore;
use crate::storage::jsonl::{DerivedFile, InputFile, JsonlReader, JsonlWriter};
use crate::storage::parquet::ParquetWriter;
use crate::storage::{StorageConfig, StorageError};

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid description pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Everything read for one season.
#[derive(Debug, Clone, Default)]
pub struct RunInput {
    pub season: Season,
    pub team_games: Vec<RawTeamGame>,
    pub player_games: Vec<RawPlayerGame>,
    pub events: Vec<PlayByPlayEvent>,

    /// Lines rejected while reading
    pub rejections: Vec<Rejection>,
}

impl RunInput {
    /// Read a season's input files. Unparseable lines become rejections.
    pub fn load(storage: &StorageConfig, season: Season) -> Result<Self, StorageError> {
        let mut rejections = Vec::new();

        let (team_games, bad) =
            JsonlReader::<RawTeamGame>::input(storage, InputFile::TeamGames, season).read_checked()?;
        reject_lines(&mut rejections, season, RejectedKind::TeamGame, InputFile::TeamGames, bad);

        let (player_games, bad) =
            JsonlReader::<RawPlayerGame>::input(storage, InputFile::PlayerGames, season)
                .read_checked()?;
        reject_lines(&mut rejections, season, RejectedKind::PlayerGame, InputFile::PlayerGames, bad);

        let (events, bad) =
            JsonlReader::<PlayByPlayEvent>::input(storage, InputFile::Events, season).read_checked()?;
        reject_lines(&mut rejections, season, RejectedKind::PlayByPlay, InputFile::Events, bad);

        info!(
            "Season {}: read {} team-games, {} player-games, {} events ({} unreadable lines)",
            season,
            team_games.len(),
            player_games.len(),
            events.len(),
            rejections.len()
        );

        Ok(Self {
            season,
            team_games,
            player_games,
            events,
            rejections,
        })
    }
}

fn reject_lines(
    out: &mut Vec<Rejection>,
    season: Season,
    kind: RejectedKind,
    file: InputFile,
    bad: Vec<crate::storage::jsonl::BadLine>,
) {
    out.extend(bad.into_iter().map(|b| Rejection {
        season,
        kind,
        record: format!("{}:{}", file.filename(), b.line),
        reason: b.error,
    }));
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub season: Season,

    /// Snapshot every rank in this run was computed against
    pub snapshot: Arc<BenchmarkSnapshot>,

    /// False when the rebuild failed and the prior snapshot was reused
    pub rebuilt: bool,

    pub team_games: Vec<TeamGameRow>,
    pub player_games: Vec<PlayerGameRow>,
    pub stints: Vec<LineupStint>,
    pub zones: Vec<ZoneShot>,
    pub play_context: Vec<PlayContext>,
    pub on_off: Vec<OnOffSplit>,
    pub lineups: Vec<LineupSummary>,
    pub rejections: Vec<Rejection>,
}

impl RunOutput {
    /// Write derived JSONL files, plus Parquet mirrors when asked.
    pub fn persist(&self, storage: &StorageConfig, parquet: bool) -> Result<(), StorageError> {
        let season = self.season;
        JsonlWriter::derived(storage, DerivedFile::TeamGames, season).write_all(&self.team_games)?;
        JsonlWriter::derived(storage, DerivedFile::PlayerGames, season)
            .write_all(&self.player_games)?;
        JsonlWriter::derived(storage, DerivedFile::LineupStints, season).write_all(&self.stints)?;
        JsonlWriter::derived(storage, DerivedFile::ShootingZones, season).write_all(&self.zones)?;
        JsonlWriter::derived(storage, DerivedFile::PlayContext, season)
            .write_all(&self.play_context)?;
        JsonlWriter::derived(storage, DerivedFile::OnOff, season).write_all(&self.on_off)?;
        JsonlWriter::derived(storage, DerivedFile::Lineups, season).write_all(&self.lineups)?;
        JsonlWriter::derived(storage, DerivedFile::Rejections, season).write_all(&self.rejections)?;

        if parquet {
            let writer = ParquetWriter::new(storage.clone());
            writer.write_team_games(season, &self.team_games)?;
            writer.write_player_games(season, &self.player_games)?;
            writer.write_lineup_stints(season, &self.stints)?;
            writer.write_shooting_zones(season, &self.zones)?;
        }
        Ok(())
    }

    /// Publish the snapshot when it was rebuilt, then write derived files.
    ///
    /// Rows carry the snapshot version they were ranked against, so they
    /// are only written once that version is the published one. A failed
    /// publish writes nothing.
    pub fn commit(
        &self,
        storage: &StorageConfig,
        publish: bool,
        write_outputs: bool,
        parquet: bool,
    ) -> Result<(), StorageError> {
        if publish && self.rebuilt {
            BenchmarkStore::new(storage.clone()).publish(&self.snapshot)?;
        }
        if write_outputs {
            self.persist(storage, parquet)?;
        }
        Ok(())
    }
}

fn rejection(season: Season, kind: RejectedKind, record: String, err: &CalcError) -> Rejection {
    Rejection {
        season,
        kind,
        record,
        reason: err.to_string(),
    }
}

type GameTeam = (GameId, TeamId);

/// Per-game play-by-play results.
#[derive(Default)]
struct GamePlay {
    stints: Vec<LineupStint>,
    zones: Vec<ZoneShot>,
    play_context: Vec<PlayContext>,
    rejection: Option<Rejection>,
}

fn process_game(
    season: Season,
    game_id: &GameId,
    events: &[PlayByPlayEvent],
    starters: Option<&BTreeMap<TeamId, Vec<PlayerId>>>,
    box_fga: &BTreeMap<GameTeam, u32>,
    classifiers: (&ZoneClassifier, &PlayClassifier),
    config: &AppConfig,
) -> GamePlay {
    let (zone_classifier, play_classifier) = classifiers;
    if let Err(e) = check_event_order(events) {
        debug!("Skipping play-by-play: {}", e);
        return GamePlay {
            rejection: Some(rejection(
                season,
                RejectedKind::PlayByPlay,
                format!("play-by-play {}", game_id),
                &e,
            )),
            ..GamePlay::default()
        };
    }

    let stints = starters
        .map(|s| reconstruct_game(game_id, s, events, config.engine.period_lengths()))
        .unwrap_or_default();

    let teams: BTreeSet<&TeamId> = events.iter().filter_map(|e| e.team_id.as_ref()).collect();
    let zones = teams
        .iter()
        .flat_map(|&team_id| {
            let fga = box_fga.get(&(game_id.clone(), team_id.clone())).copied();
            aggregate_zones(zone_classifier, season, game_id, team_id, events, fga)
        })
        .collect();
    let contexts = teams
        .iter()
        .map(|&team_id| play_context(play_classifier, season, game_id, team_id, events))
        .collect();

    GamePlay {
        stints,
        zones,
        play_context: contexts,
        rejection: None,
    }
}

/// Validation gate for team sides, then pairing.
fn gate_team_games(
    season: Season,
    raws: &[RawTeamGame],
    rejections: &mut Vec<Rejection>,
) -> Vec<GameRecord> {
    let mut sides = Vec::with_capacity(raws.len());
    for raw in raws {
        match raw.validate() {
            Ok(side) => sides.push(side),
            Err(e) => rejections.push(rejection(
                season,
                RejectedKind::TeamGame,
                raw.describe(),
                &CalcError::from(e),
            )),
        }
    }
    let (records, unpaired) = pair_team_games(sides);
    for err in unpaired {
        let record = err
            .game_id()
            .map(|g| format!("game {}", g))
            .unwrap_or_default();
        rejections.push(rejection(season, RejectedKind::TeamGame, record, &err));
    }
    records
}

fn gate_player_games(
    season: Season,
    raws: &[RawPlayerGame],
    rejections: &mut Vec<Rejection>,
) -> Vec<PlayerGameRecord> {
    let mut players = Vec::with_capacity(raws.len());
    for raw in raws {
        match raw.validate() {
            Ok(p) => players.push(p),
            Err(e) => rejections.push(rejection(
                season,
                RejectedKind::PlayerGame,
                raw.describe(),
                &CalcError::from(e),
            )),
        }
    }
    players
}

/// Run only the validation gates: field checks, pairing and event order.
/// Returns every rejection a full run would report.
pub fn check(input: &RunInput) -> Vec<Rejection> {
    let season = input.season;
    let mut rejections = input.rejections.clone();
    gate_team_games(season, &input.team_games, &mut rejections);
    gate_player_games(season, &input.player_games, &mut rejections);
    for (game_id, events) in events_by_game(input.events.clone()) {
        if let Err(e) = check_event_order(&events) {
            rejections.push(rejection(
                season,
                RejectedKind::PlayByPlay,
                format!("play-by-play {}", game_id),
                &e,
            ));
        }
    }
    rejections
}

/// Run the whole derivation for one season.
///
/// `prior` is the currently published snapshot. The season is rebuilt
/// from this run's population; if that fails the prior snapshot is used
/// unchanged and `rebuilt` is false.
pub fn run(
    input: RunInput,
    prior: &BenchmarkSnapshot,
    config: &AppConfig,
) -> Result<RunOutput, PipelineError> {
    let season = input.season;
    let zone_classifier = ZoneClassifier::new()?;
    let play_classifier = PlayClassifier::new()?;
    let mut rejections = input.rejections;

    let records = gate_team_games(season, &input.team_games, &mut rejections);
    let team_sets: Vec<MetricSet> = records
        .par_iter()
        .map(|r| team_metrics(&r.team.counts, &r.opponent.counts))
        .collect();

    // Player lines.
    let usage: BTreeMap<GameTeam, TeamUsageContext> = records
        .iter()
        .map(|r| ((r.game_id().clone(), r.team_id().clone()), TeamUsageContext::from(&r.team)))
        .collect();
    let players = gate_player_games(season, &input.player_games, &mut rejections);
    let player_sets: Vec<PlayerMetrics> = players
        .par_iter()
        .map(|p| player_metrics(p, usage.get(&(p.game_id.clone(), p.team_id.clone()))))
        .collect();

    // Play-by-play, one game per task.
    let mut starters: BTreeMap<GameId, BTreeMap<TeamId, Vec<PlayerId>>> = BTreeMap::new();
    for p in players.iter().filter(|p| p.starter) {
        starters
            .entry(p.game_id.clone())
            .or_default()
            .entry(p.team_id.clone())
            .or_default()
            .push(p.player_id.clone());
    }
    let box_fga: BTreeMap<GameTeam, u32> = records
        .iter()
        .map(|r| ((r.game_id().clone(), r.team_id().clone()), r.team.counts.fga))
        .collect();
    let games: Vec<(GameId, Vec<PlayByPlayEvent>)> = events_by_game(input.events).into_iter().collect();
    let plays: Vec<GamePlay> = games
        .par_iter()
        .map(|(game_id, events)| {
            process_game(
                season,
                game_id,
                events,
                starters.get(game_id),
                &box_fga,
                (&zone_classifier, &play_classifier),
                config,
            )
        })
        .collect();

    let mut stints = Vec::new();
    let mut zones = Vec::new();
    let mut play_contexts = Vec::new();
    for play in plays {
        stints.extend(play.stints);
        zones.extend(play.zones);
        play_contexts.extend(play.play_context);
        rejections.extend(play.rejection);
    }
    let on_off = on_off_splits(season, &stints);
    let lineups = group_lineups(season, &stints);

    // Rolling context over each team's chronological history.
    let game_metrics: Vec<GameMetrics> = records
        .iter()
        .zip(&team_sets)
        .map(|(r, metrics)| GameMetrics {
            team_id: r.team_id(),
            game_date: r.game_date(),
            game_id: r.game_id(),
            metrics,
        })
        .collect();
    let rolling = rolling_context(&game_metrics, config.engine.rolling_window);

    // Rebuild and freeze the benchmark snapshot before any lookup.
    let team_refs: Vec<&MetricSet> = team_sets.iter().collect();
    let samples: Vec<PlayerSample> = players
        .iter()
        .zip(&player_sets)
        .map(|(p, m)| PlayerSample {
            position: p.position,
            minutes: p.minutes,
            fga: p.counts.fga,
            usage_basis: m.usage_basis,
            metrics: &m.metrics,
        })
        .collect();
    let (snapshot, rebuilt) = match rebuild_snapshot(
        prior,
        season,
        &team_refs,
        &samples,
        &config.benchmarks.rules(),
        Utc::now(),
    ) {
        Ok(snapshot) => (snapshot, true),
        Err(e) => {
            warn!("Benchmark rebuild failed, keeping v{}: {}", prior.version(), e);
            (prior.clone(), false)
        }
    };
    let snapshot = Arc::new(snapshot);
    let ranker = Ranker::new(&snapshot, config.benchmarks.reference_season);

    let team_ranks: Vec<_> = records
        .par_iter()
        .zip(team_sets.par_iter())
        .map(|(r, metrics)| ranker.rank_team(r.season(), metrics))
        .collect();
    let index: BTreeMap<(&GameId, &TeamId), usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| ((r.game_id(), r.team_id()), i))
        .collect();

    let label_rules = config.labels.rules();
    let team_games: Vec<TeamGameRow> = records
        .iter()
        .zip(team_sets)
        .zip(rolling)
        .enumerate()
        .map(|(i, ((record, metrics), rolling))| {
            let empty = BTreeMap::new();
            let opponent_ranks = index
                .get(&(record.game_id(), record.opponent_id()))
                .map(|&j| &team_ranks[j])
                .unwrap_or(&empty);
            team_row(
                record,
                metrics,
                rolling,
                team_ranks[i].clone(),
                opponent_ranks,
                &label_rules,
                ranker.version(),
            )
        })
        .collect();

    let player_games: Vec<PlayerGameRow> = players
        .par_iter()
        .zip(player_sets.into_par_iter())
        .map(|(p, computed)| {
            let ranks = ranker.rank_player(p, &computed);
            player_row(p, computed, ranks, ranker.version())
        })
        .collect();

    info!(
        "Season {}: {} team-games, {} player-games, {} stints, {} rejections, benchmarks v{}",
        season,
        team_games.len(),
        player_games.len(),
        stints.len(),
        rejections.len(),
        snapshot.version()
    );

    Ok(RunOutput {
        season,
        snapshot: Arc::clone(&snapshot),
        rebuilt,
        team_games,
        player_games,
        stints,
        zones,
        play_context: play_contexts,
        on_off,
        lineups,
        rejections,
    })
}
