//! # Scout Engine
//!
//! Basketball box-score derivation, lineup reconstruction and benchmarking.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (games, events, stints, benchmarks, rows)
//! - **calculate**: Metrics, lineup replay, zones, rolling context, percentiles and labels
//! - **pipeline**: Single-pass batch derivation for one season
//! - **storage**: Data directory operations (JSONL, Parquet, benchmark snapshots)
//! - **config**: Configuration loading and validation

pub mod calculate;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod storage;

pub use models::*;
