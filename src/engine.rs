//! Strategy invocation boundary.
//!
//! Each invocation opens a fresh driver whose bulk size follows the batch
//! size, runs one strategy against it and closes it again. The outcome is a
//! [`TrialResult`], which carries the partial duration even when the trial
//! failed.

use std::fmt;
use std::time::Duration;

use tracing::{info, warn};

use crate::driver::{Connector, Driver, DriverSettings};
use crate::error::{BenchError, Result};
use crate::params::Parameter;
use crate::strategy::{Strategy, TrialPlan};
use crate::table::TableName;

/// Extra pool connections beyond one per worker.
const SPARE_CONNECTIONS: u32 = 8;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub table: TableName,
    /// Recreate existing tables before every trial.
    pub drop: bool,
    pub separate: bool,
    pub wait: Duration,
    /// Pool size; zero sizes the pool from the batch count.
    pub max_connections: u32,
}

impl EngineConfig {
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            drop: false,
            separate: false,
            wait: Duration::ZERO,
            max_connections: 0,
        }
    }
}

/// One strategy invocation.
#[derive(Clone, Debug)]
pub struct Request {
    pub strategy: Strategy,
    pub batch_count: usize,
    pub batch_size: usize,
    pub drop: bool,
    pub separate: bool,
    pub wait: Duration,
}

impl Request {
    pub fn with_drop(mut self, drop: bool) -> Self {
        self.drop = drop;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrialResult {
    pub strategy: Strategy,
    pub batch_count: usize,
    pub batch_size: usize,
    /// Bulk flush threshold the driver actually used.
    pub bulk_size: usize,
    pub elapsed: Duration,
    pub error: Option<String>,
}

impl TrialResult {
    pub fn seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn total_rows(&self) -> usize {
        self.batch_count.saturating_mul(self.batch_size)
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for TrialResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(e) = &self.error {
            return f.write_str(e);
        }
        write!(
            f,
            "{}: insert of {} rows in {:.6} seconds (batchCount {} batchSize {} bulkSize {})",
            self.strategy,
            self.total_rows(),
            self.seconds(),
            self.batch_count,
            self.batch_size,
            self.bulk_size
        )
    }
}

/// Rejects trial shapes no driver can run: empty ones, ones whose row count
/// overflows and ones with more workers than a pool can hold.
fn validate(req: &Request) -> Result<()> {
    let shape = format!("{}x{}", req.batch_count, req.batch_size);
    if req.batch_count == 0 || req.batch_size == 0 {
        return Err(BenchError::Configuration(format!(
            "batch count and batch size must be positive (got {shape})"
        )));
    }
    if req.batch_count.checked_mul(req.batch_size).is_none() {
        return Err(BenchError::Configuration(format!("total rows of {shape} overflow")));
    }
    if u32::try_from(req.batch_count).is_err() {
        return Err(BenchError::Configuration(format!(
            "batch count of {shape} exceeds the connection limit"
        )));
    }
    Ok(())
}

pub struct Engine<C> {
    connector: C,
    config: EngineConfig,
}

impl<C: Connector> Engine<C> {
    pub fn new(connector: C, config: EngineConfig) -> Self {
        Self { connector, config }
    }

    /// A request for `strategy` with the configured table flags.
    pub fn request(&self, strategy: Strategy, prm: Parameter) -> Request {
        Request {
            strategy,
            batch_count: prm.batch_count,
            batch_size: prm.batch_size,
            drop: self.config.drop,
            separate: self.config.separate,
            wait: self.config.wait,
        }
    }

    fn settings(&self, req: &Request) -> DriverSettings {
        let max_connections = match self.config.max_connections {
            0 => u32::try_from(req.batch_count)
                .unwrap_or(u32::MAX)
                .saturating_add(SPARE_CONNECTIONS),
            n => n,
        };
        DriverSettings::new(req.batch_size).max_connections(max_connections)
    }

    pub async fn execute(&self, req: Request) -> TrialResult {
        let mut result = TrialResult {
            strategy: req.strategy,
            batch_count: req.batch_count,
            batch_size: req.batch_size,
            bulk_size: 0,
            elapsed: Duration::ZERO,
            error: None,
        };

        if let Err(e) = validate(&req) {
            result.error = Some(e.to_string());
            warn!(strategy = %req.strategy, error = %e, "trial_rejected");
            return result;
        }

        let driver = match self.connector.open(&self.settings(&req)).await {
            Ok(driver) => driver,
            Err(e) => {
                result.error = Some(e.to_string());
                warn!(strategy = %req.strategy, error = %e, "driver_open_failed");
                return result;
            }
        };

        let plan = TrialPlan {
            table: self.config.table.clone(),
            batch_count: req.batch_count,
            batch_size: req.batch_size,
            recreate: req.drop,
            separate: req.separate,
            wait: req.wait,
        };
        let measurement = req.strategy.run(&driver, &plan).await;
        result.bulk_size = driver.bulk_size();
        driver.close().await;

        result.elapsed = measurement.elapsed;
        result.error = measurement.error.map(|e| e.to_string());
        match &result.error {
            None => info!(
                strategy = %result.strategy,
                rows = result.total_rows(),
                seconds = result.seconds(),
                batch_count = result.batch_count,
                batch_size = result.batch_size,
                bulk_size = result.bulk_size,
                "trial_complete"
            ),
            Some(e) => warn!(
                strategy = %result.strategy,
                seconds = result.seconds(),
                error = %e,
                "trial_failed"
            ),
        }
        result
    }
}
