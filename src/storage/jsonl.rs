//! JSONL (JSON Lines) storage.
//!
//! Inputs and derived outputs are JSONL, one record per line, grouped by
//! season.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::{StorageConfig, StorageError};
use crate::models::Season;

/// Per-season input files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFile {
    TeamGames,
    PlayerGames,
    Events,
}

impl InputFile {
    pub fn filename(&self) -> &'static str {
        match self {
            InputFile::TeamGames => "team_games.jsonl",
            InputFile::PlayerGames => "player_games.jsonl",
            InputFile::Events => "events.jsonl",
        }
    }

    pub fn path(&self, config: &StorageConfig, season: Season) -> PathBuf {
        config.input_dir(season).join(self.filename())
    }
}

/// Per-season derived output files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedFile {
    TeamGames,
    PlayerGames,
    LineupStints,
    ShootingZones,
    PlayContext,
    OnOff,
    Lineups,
    Rejections,
}

impl DerivedFile {
    pub fn filename(&self) -> &'static str {
        match self {
            DerivedFile::TeamGames => "team_games.jsonl",
            DerivedFile::PlayerGames => "player_games.jsonl",
            DerivedFile::LineupStints => "lineup_stints.jsonl",
            DerivedFile::ShootingZones => "shooting_zones.jsonl",
            DerivedFile::PlayContext => "play_context.jsonl",
            DerivedFile::OnOff => "on_off.jsonl",
            DerivedFile::Lineups => "lineups.jsonl",
            DerivedFile::Rejections => "rejections.jsonl",
        }
    }

    pub fn path(&self, config: &StorageConfig, season: Season) -> PathBuf {
        config.derived_dir(season).join(self.filename())
    }
}

/// A line that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadLine {
    pub line: usize,
    pub error: String,
}

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    /// Create a new JSONL writer for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a writer for a derived output of a season.
    pub fn derived(config: &StorageConfig, file: DerivedFile, season: Season) -> Self {
        Self::new(file.path(config, season))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn ensure_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Write entities, replacing the entire file.
    pub fn write_all(&self, entities: &[T]) -> Result<usize, StorageError> {
        self.ensure_dir()?;

        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        let mut count = 0;

        for entity in entities {
            let json = serde_json::to_string(entity)?;
            writeln!(writer, "{}", json)?;
            count += 1;
        }

        writer.flush()?;
        info!("Wrote {} entities to {:?}", count, self.path);

        Ok(count)
    }
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    /// Create a new JSONL reader for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a reader for a season's input file.
    pub fn input(config: &StorageConfig, file: InputFile, season: Season) -> Self {
        Self::new(file.path(config, season))
    }

    /// Create a reader for a season's derived output.
    pub fn derived(config: &StorageConfig, file: DerivedFile, season: Season) -> Self {
        Self::new(file.path(config, season))
    }

    /// Check if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all entities, collecting lines that fail to parse.
    ///
    /// A missing file reads as empty.
    pub fn read_checked(&self) -> Result<(Vec<T>, Vec<BadLine>), StorageError> {
        if !self.path.exists() {
            return Ok((Vec::new(), Vec::new()));
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut entities = Vec::new();
        let mut bad = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entity) => entities.push(entity),
                Err(e) => bad.push(BadLine {
                    line: idx + 1,
                    error: e.to_string(),
                }),
            }
        }

        debug!(
            "Read {} entities from {:?} ({} bad lines)",
            entities.len(),
            self.path,
            bad.len()
        );
        Ok((entities, bad))
    }

    /// Read all entities, skipping (and logging) lines that fail to parse.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        let (entities, bad) = self.read_checked()?;
        for b in &bad {
            warn!("Failed to parse line {} in {:?}: {}", b.line, self.path, b.error);
        }
        Ok(entities)
    }

    /// Count non-empty lines in the file.
    pub fn count(&self) -> Result<usize, StorageError> {
        if !self.path.exists() {
            return Ok(0);
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut count = 0;
        for line in reader.lines() {
            if !line?.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Find all seasons with an input directory.
pub fn list_seasons(config: &StorageConfig) -> Result<Vec<Season>, StorageError> {
    let dir = config.input_root();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut seasons = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        match name.to_str().and_then(|n| n.parse::<Season>().ok()) {
            Some(season) => seasons.push(season),
            None => debug!("Ignoring non-season directory {:?}", name),
        }
    }

    seasons.sort_unstable();
    Ok(seasons)
}
