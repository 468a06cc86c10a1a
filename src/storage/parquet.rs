//! Parquet storage for analytics.
//!
//! Parquet files mirror the derived JSONL outputs for fast analytical
//! queries. They are rewritten on every derive run.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, UInt32Array, UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tracing::{debug, info};

use super::{StorageConfig, StorageError};
use crate::models::{
    LineupStint, MetricId, MetricSet, PlayerGameRow, Season, StintStatus, TeamGameRow, ZoneShot,
    PLAYER_METRICS, TEAM_METRICS,
};

/// Parquet table types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableType {
    TeamGames,
    PlayerGames,
    LineupStints,
    ShootingZones,
}

impl TableType {
    /// Get the filename for this table.
    pub fn filename(&self) -> &'static str {
        match self {
            TableType::TeamGames => "team_games.parquet",
            TableType::PlayerGames => "player_games.parquet",
            TableType::LineupStints => "lineup_stints.parquet",
            TableType::ShootingZones => "shooting_zones.parquet",
        }
    }
}

/// Schema definitions for Parquet tables.
///
/// Metric tables carry one nullable Float64 column per metric, named by
/// its identifier.
pub mod schemas {
    use super::*;

    fn metric_fields(metrics: &[MetricId]) -> impl Iterator<Item = Field> + '_ {
        metrics
            .iter()
            .map(|m| Field::new(m.as_str(), DataType::Float64, true))
    }

    pub fn team_games_schema() -> Schema {
        let mut fields = vec![
            Field::new("record_key", DataType::Utf8, false),
            Field::new("season", DataType::UInt32, false),
            Field::new("game_id", DataType::Utf8, false),
            Field::new("game_date", DataType::Utf8, false),
            Field::new("team_id", DataType::Utf8, false),
            Field::new("team_name", DataType::Utf8, true),
            Field::new("opponent_id", DataType::Utf8, false),
            Field::new("points", DataType::UInt32, false),
            Field::new("opponent_points", DataType::UInt32, false),
            Field::new("margin", DataType::Int64, false),
            Field::new("won", DataType::Boolean, false),
            Field::new("game_context", DataType::Utf8, false),
            Field::new("why_won", DataType::Utf8, true),
            Field::new("benchmark_version", DataType::UInt64, false),
        ];
        fields.extend(metric_fields(&TEAM_METRICS));
        Schema::new(fields)
    }

    pub fn player_games_schema() -> Schema {
        let mut fields = vec![
            Field::new("record_key", DataType::Utf8, false),
            Field::new("season", DataType::UInt32, false),
            Field::new("game_id", DataType::Utf8, false),
            Field::new("team_id", DataType::Utf8, false),
            Field::new("player_id", DataType::Utf8, false),
            Field::new("player_name", DataType::Utf8, true),
            Field::new("position", DataType::Utf8, false),
            Field::new("starter", DataType::Boolean, false),
            Field::new("minutes", DataType::Float64, false),
            Field::new("dnq", DataType::Boolean, false),
            Field::new("usage_basis", DataType::Utf8, true),
            Field::new("role", DataType::Utf8, true),
            Field::new("role_color", DataType::Utf8, true),
            Field::new("benchmark_version", DataType::UInt64, false),
        ];
        fields.extend(metric_fields(&PLAYER_METRICS));
        Schema::new(fields)
    }

    pub fn lineup_stints_schema() -> Schema {
        Schema::new(vec![
            Field::new("season", DataType::UInt32, false),
            Field::new("game_id", DataType::Utf8, false),
            Field::new("team_id", DataType::Utf8, false),
            Field::new("sequence", DataType::UInt32, false),
            Field::new("period", DataType::UInt32, false),
            Field::new("start_secs", DataType::Float64, false),
            Field::new("end_secs", DataType::Float64, false),
            Field::new("duration_secs", DataType::Float64, false),
            Field::new("lineup_key", DataType::Utf8, true),
            Field::new("unresolved_reason", DataType::Utf8, true),
            Field::new("points_for", DataType::UInt32, false),
            Field::new("points_against", DataType::UInt32, false),
            Field::new("possessions", DataType::Float64, false),
            Field::new("opponent_possessions", DataType::Float64, false),
        ])
    }

    pub fn shooting_zones_schema() -> Schema {
        Schema::new(vec![
            Field::new("season", DataType::UInt32, false),
            Field::new("game_id", DataType::Utf8, false),
            Field::new("team_id", DataType::Utf8, false),
            Field::new("zone", DataType::Utf8, false),
            Field::new("fgm", DataType::UInt32, false),
            Field::new("fga", DataType::UInt32, false),
            Field::new("points", DataType::UInt32, false),
            Field::new("fg_pct", DataType::Float64, true),
            Field::new("fga_share", DataType::Float64, true),
        ])
    }
}

fn strings<T, F>(rows: &[T], f: F) -> ArrayRef
where
    F: Fn(&T) -> String,
{
    Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn opt_strings<T, F>(rows: &[T], f: F) -> ArrayRef
where
    F: Fn(&T) -> Option<String>,
{
    Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn u32s<T, F>(rows: &[T], f: F) -> ArrayRef
where
    F: Fn(&T) -> u32,
{
    Arc::new(UInt32Array::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn f64s<T, F>(rows: &[T], f: F) -> ArrayRef
where
    F: Fn(&T) -> Option<f64>,
{
    Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn metric_columns<T, F>(rows: &[T], metrics: &[MetricId], f: F) -> Vec<ArrayRef>
where
    F: Fn(&T) -> &MetricSet,
{
    metrics
        .iter()
        .map(|&m| f64s(rows, |r| f(r).get(m)))
        .collect()
}

/// Parquet file writer.
pub struct ParquetWriter {
    config: StorageConfig,
}

impl ParquetWriter {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    fn table_path(&self, table: TableType, season: Season) -> PathBuf {
        self.config.parquet_dir(season).join(table.filename())
    }

    fn ensure_dir(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    pub fn write_team_games(&self, season: Season, rows: &[TeamGameRow]) -> Result<(), StorageError> {
        let schema = Arc::new(schemas::team_games_schema());
        let mut columns = vec![
            strings(rows, |r| r.record_key.to_string()),
            u32s(rows, |r| u32::from(r.season)),
            strings(rows, |r| r.game_id.to_string()),
            strings(rows, |r| r.game_date.to_string()),
            strings(rows, |r| r.team_id.to_string()),
            opt_strings(rows, |r| r.team_name.clone()),
            strings(rows, |r| r.opponent_id.to_string()),
            u32s(rows, |r| r.points),
            u32s(rows, |r| r.opponent_points),
            Arc::new(Int64Array::from(rows.iter().map(|r| r.margin).collect::<Vec<_>>())) as ArrayRef,
            Arc::new(BooleanArray::from(rows.iter().map(|r| r.won).collect::<Vec<_>>())) as ArrayRef,
            strings(rows, |r| r.game_context.to_string()),
            opt_strings(rows, |r| {
                (!r.why_won.is_empty()).then(|| {
                    r.why_won
                        .iter()
                        .map(|d| d.to_string())
                        .collect::<Vec<_>>()
                        .join("; ")
                })
            }),
            Arc::new(UInt64Array::from(
                rows.iter().map(|r| r.benchmark_version).collect::<Vec<_>>(),
            )) as ArrayRef,
        ];
        columns.extend(metric_columns(rows, &TEAM_METRICS, |r| &r.metrics));

        let path = self.table_path(TableType::TeamGames, season);
        self.write_batch(&path, &schema, RecordBatch::try_new(schema.clone(), columns)?)?;
        info!("Wrote {} team-games to {:?}", rows.len(), path);
        Ok(())
    }

    pub fn write_player_games(
        &self,
        season: Season,
        rows: &[PlayerGameRow],
    ) -> Result<(), StorageError> {
        let schema = Arc::new(schemas::player_games_schema());
        let mut columns = vec![
            strings(rows, |r| r.record_key.to_string()),
            u32s(rows, |r| u32::from(r.season)),
            strings(rows, |r| r.game_id.to_string()),
            strings(rows, |r| r.team_id.to_string()),
            strings(rows, |r| r.player_id.to_string()),
            opt_strings(rows, |r| r.player_name.clone()),
            strings(rows, |r| r.position.to_string()),
            Arc::new(BooleanArray::from(rows.iter().map(|r| r.starter).collect::<Vec<_>>())) as ArrayRef,
            f64s(rows, |r| Some(r.minutes)),
            Arc::new(BooleanArray::from(rows.iter().map(|r| r.dnq).collect::<Vec<_>>())) as ArrayRef,
            opt_strings(rows, |r| r.usage_basis.map(|b| b.as_str().to_string())),
            opt_strings(rows, |r| r.role.map(|role| role.to_string())),
            opt_strings(rows, |r| r.role_color.clone()),
            Arc::new(UInt64Array::from(
                rows.iter().map(|r| r.benchmark_version).collect::<Vec<_>>(),
            )) as ArrayRef,
        ];
        columns.extend(metric_columns(rows, &PLAYER_METRICS, |r| &r.metrics));

        let path = self.table_path(TableType::PlayerGames, season);
        self.write_batch(&path, &schema, RecordBatch::try_new(schema.clone(), columns)?)?;
        info!("Wrote {} player-games to {:?}", rows.len(), path);
        Ok(())
    }

    pub fn write_lineup_stints(
        &self,
        season: Season,
        stints: &[LineupStint],
    ) -> Result<(), StorageError> {
        let schema = Arc::new(schemas::lineup_stints_schema());
        let columns = vec![
            u32s(stints, |_| u32::from(season)),
            strings(stints, |s| s.game_id.to_string()),
            strings(stints, |s| s.team_id.to_string()),
            u32s(stints, |s| s.sequence),
            u32s(stints, |s| u32::from(s.period)),
            f64s(stints, |s| Some(s.start_clock.seconds())),
            f64s(stints, |s| Some(s.end_clock.seconds())),
            f64s(stints, |s| Some(s.duration_secs())),
            opt_strings(stints, |s| s.lineup_key()),
            opt_strings(stints, |s| match &s.status {
                StintStatus::Unresolved { reason, .. } => Some(reason.to_string()),
                StintStatus::Resolved { .. } => None,
            }),
            u32s(stints, |s| s.team.pts),
            u32s(stints, |s| s.opponent.pts),
            f64s(stints, |s| Some(s.possessions)),
            f64s(stints, |s| Some(s.opponent_possessions)),
        ];

        let path = self.table_path(TableType::LineupStints, season);
        self.write_batch(&path, &schema, RecordBatch::try_new(schema.clone(), columns)?)?;
        info!("Wrote {} stints to {:?}", stints.len(), path);
        Ok(())
    }

    pub fn write_shooting_zones(&self, season: Season, zones: &[ZoneShot]) -> Result<(), StorageError> {
        let schema = Arc::new(schemas::shooting_zones_schema());
        let columns = vec![
            u32s(zones, |z| u32::from(z.season)),
            strings(zones, |z| z.game_id.to_string()),
            strings(zones, |z| z.team_id.to_string()),
            strings(zones, |z| z.zone.as_str().to_string()),
            u32s(zones, |z| z.fgm),
            u32s(zones, |z| z.fga),
            u32s(zones, |z| z.points),
            f64s(zones, |z| z.fg_pct),
            f64s(zones, |z| z.fga_share),
        ];

        let path = self.table_path(TableType::ShootingZones, season);
        self.write_batch(&path, &schema, RecordBatch::try_new(schema.clone(), columns)?)?;
        info!("Wrote {} zone rows to {:?}", zones.len(), path);
        Ok(())
    }

    /// Write a record batch to a Parquet file.
    fn write_batch(
        &self,
        path: &Path,
        schema: &Arc<Schema>,
        batch: RecordBatch,
    ) -> Result<(), StorageError> {
        self.ensure_dir(path)?;
        let file = File::create(path)?;

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        Ok(())
    }
}

/// Parquet file reader.
pub struct ParquetReader {
    config: StorageConfig,
}

impl ParquetReader {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    fn table_path(&self, table: TableType, season: Season) -> PathBuf {
        self.config.parquet_dir(season).join(table.filename())
    }

    /// Check if a table exists for a season.
    pub fn exists(&self, table: TableType, season: Season) -> bool {
        self.table_path(table, season).exists()
    }

    /// Read all record batches from a Parquet file.
    pub fn read_batches(
        &self,
        table: TableType,
        season: Season,
    ) -> Result<Vec<RecordBatch>, StorageError> {
        let path = self.table_path(table, season);

        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
        let batches = reader.collect::<Result<Vec<_>, _>>()?;

        debug!("Read {} batches from {:?}", batches.len(), path);
        Ok(batches)
    }

    /// Get row count for a table.
    pub fn count(&self, table: TableType, season: Season) -> Result<usize, StorageError> {
        let batches = self.read_batches(table, season)?;
        Ok(batches.iter().map(|b| b.num_rows()).sum())
    }
}
