//! Filesystem data directory operations.
//!
//! Handles reading and writing under the data directory:
//! - Per-season JSONL input and derived outputs
//! - Parquet analytics mirrors
//! - The published benchmark snapshot and its history

pub mod benchmark_store;
pub mod jsonl;
pub mod parquet;

use std::path::PathBuf;
use thiserror::Error;

use crate::models::Season;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ::parquet::errors::ParquetError),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn input_root(&self) -> PathBuf {
        self.data_dir.join("input")
    }

    pub fn input_dir(&self, season: Season) -> PathBuf {
        self.input_root().join(season.to_string())
    }

    pub fn derived_dir(&self, season: Season) -> PathBuf {
        self.data_dir.join("derived").join(season.to_string())
    }

    pub fn parquet_dir(&self, season: Season) -> PathBuf {
        self.data_dir.join("parquet").join(season.to_string())
    }

    pub fn benchmarks_dir(&self) -> PathBuf {
        self.data_dir.join("benchmarks")
    }

    pub fn benchmark_history_dir(&self) -> PathBuf {
        self.benchmarks_dir().join("history")
    }

    pub fn current_benchmarks_path(&self) -> PathBuf {
        self.benchmarks_dir().join("current.json")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_paths() {
        let config = StorageConfig::new(PathBuf::from("/data"));

        assert_eq!(config.input_dir(2025), PathBuf::from("/data/input/2025"));
        assert_eq!(config.derived_dir(2025), PathBuf::from("/data/derived/2025"));
        assert_eq!(config.parquet_dir(2024), PathBuf::from("/data/parquet/2024"));
        assert_eq!(
            config.current_benchmarks_path(),
            PathBuf::from("/data/benchmarks/current.json")
        );
        assert_eq!(
            config.benchmark_history_dir(),
            PathBuf::from("/data/benchmarks/history")
        );
    }

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
    }
}
