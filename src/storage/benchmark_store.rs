//! Published benchmark snapshot.
//!
//! One writer, many readers. A new snapshot is written to a staging file,
//! flushed to disk, then renamed over `current.json`. Readers never see a
//! partial file. The snapshot being replaced is archived by version.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use tracing::{debug, info};

use super::{StorageConfig, StorageError};
use crate::models::BenchmarkSnapshot;

pub struct BenchmarkStore {
    config: StorageConfig,
}

impl BenchmarkStore {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    fn staging_path(&self) -> PathBuf {
        self.config
            .benchmarks_dir()
            .join("current.json.staging")
    }

    pub fn history_path(&self, version: u64) -> PathBuf {
        self.config
            .benchmark_history_dir()
            .join(format!("v{}.json", version))
    }

    fn read(path: &PathBuf) -> Result<BenchmarkSnapshot, StorageError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Load the published snapshot, or an empty version-0 snapshot when
    /// nothing has been published yet.
    pub fn load_current(&self) -> Result<BenchmarkSnapshot, StorageError> {
        let path = self.config.current_benchmarks_path();
        if !path.exists() {
            debug!("No published benchmarks at {:?}", path);
            return Ok(BenchmarkSnapshot::empty());
        }
        let snapshot = Self::read(&path)?;
        debug!(
            "Loaded benchmarks v{} ({} distributions)",
            snapshot.version(),
            snapshot.len()
        );
        Ok(snapshot)
    }

    /// Load an archived snapshot.
    pub fn load_version(&self, version: u64) -> Result<BenchmarkSnapshot, StorageError> {
        let path = self.history_path(version);
        if !path.exists() {
            return Err(StorageError::PathNotFound(path));
        }
        Self::read(&path)
    }

    /// Archived versions, ascending.
    pub fn history(&self) -> Result<Vec<u64>, StorageError> {
        let dir = self.config.benchmark_history_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut versions = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let name = entry?.file_name();
            let version = name
                .to_str()
                .and_then(|n| n.strip_prefix('v'))
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.parse::<u64>().ok());
            if let Some(v) = version {
                versions.push(v);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    /// Publish `snapshot` as current, archiving the snapshot it replaces.
    ///
    /// Any failure before the final rename leaves `current.json` as it was.
    pub fn publish(&self, snapshot: &BenchmarkSnapshot) -> Result<PathBuf, StorageError> {
        let current = self.config.current_benchmarks_path();
        fs::create_dir_all(self.config.benchmark_history_dir())?;

        if current.exists() {
            let previous = Self::read(&current)?;
            let archive = self.history_path(previous.version());
            fs::copy(&current, &archive)?;
            debug!("Archived benchmarks v{} to {:?}", previous.version(), archive);
        }

        let staging = self.staging_path();
        {
            let mut writer = BufWriter::new(File::create(&staging)?);
            serde_json::to_writer_pretty(&mut writer, snapshot)?;
            writer.flush()?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&staging, &current)?;

        info!(
            "Published benchmarks v{} ({} distributions) to {:?}",
            snapshot.version(),
            snapshot.len(),
            current
        );
        Ok(current)
    }
}
