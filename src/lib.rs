//! Insert throughput benchmark.
//!
//! Compares four ways of loading synthetic sensor rows into a row store:
//! buffered single-row submission ("bulk") against whole-array submission
//! ("many"), each on one connection or fanned out over one dedicated
//! connection per worker.

pub mod bench;
pub mod config;
pub mod db;
pub mod driver;
pub mod engine;
pub mod error;
pub mod params;
pub mod row;
pub mod stats;
pub mod strategy;
pub mod table;
pub mod task;

pub use engine::{Engine, EngineConfig, Request, TrialResult};
pub use error::{BenchError, Result};
pub use params::{Parameter, ParameterSet};
pub use stats::Statistics;
pub use strategy::Strategy;
