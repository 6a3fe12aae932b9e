use std::fmt::Display;
use std::num::ParseIntError;

use thiserror::Error;

/// Errors surfaced by the benchmark engine and its collaborators.
///
/// Driver failures are folded into the connection / prepare / execution /
/// teardown buckets at the driver boundary; their message is kept verbatim.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("invalid parameter {0:?}: expected <count>x<size>")]
    Format(String),

    #[error("invalid integer in parameter {token:?}: {source}")]
    FormatInt {
        token: String,
        #[source]
        source: ParseIntError,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid test {0}")]
    InvalidTest(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("prepare error: {0}")]
    Prepare(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("teardown error: {0}")]
    Teardown(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("{strategy} trial {trial} failed: {message}")]
    Trial {
        strategy: String,
        trial: usize,
        message: String,
    },
}

impl BenchError {
    pub fn connection(e: impl Display) -> Self {
        Self::Connection(e.to_string())
    }

    pub fn prepare(e: impl Display) -> Self {
        Self::Prepare(e.to_string())
    }

    pub fn execution(e: impl Display) -> Self {
        Self::Execution(e.to_string())
    }

    pub fn table(e: impl Display) -> Self {
        Self::Table(e.to_string())
    }
}

pub type Result<T, E = BenchError> = std::result::Result<T, E>;
