//! The four insertion strategies.
//!
//! Only time spent inside row submission calls is measured. Sequential
//! strategies add up the individual calls; parallel strategies measure the
//! wall clock from launching the first worker until the last one is joined,
//! so a parallel speed-up shows in the number.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tracing::debug;

use crate::driver::{Connection, Driver};
use crate::error::{BenchError, Result};
use crate::row;
use crate::table::{ensure_table, Insert, InsertMode, TableName};
use crate::task::{create_tasks, Task};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    BulkSeq,
    ManySeq,
    BulkPar,
    ManyPar,
}

impl Strategy {
    /// All strategies in report order.
    pub const ALL: [Strategy; 4] = [
        Strategy::BulkSeq,
        Strategy::ManySeq,
        Strategy::BulkPar,
        Strategy::ManyPar,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::BulkSeq => "BulkSeq",
            Strategy::ManySeq => "ManySeq",
            Strategy::BulkPar => "BulkPar",
            Strategy::ManyPar => "ManyPar",
        }
    }

    pub fn mode(&self) -> InsertMode {
        match self {
            Strategy::BulkSeq | Strategy::BulkPar => InsertMode::Bulk,
            Strategy::ManySeq | Strategy::ManyPar => InsertMode::Many,
        }
    }

    pub async fn run<D: Driver>(&self, driver: &D, plan: &TrialPlan) -> Measurement {
        debug!(
            strategy = self.name(),
            batch_count = plan.batch_count,
            batch_size = plan.batch_size,
            "strategy_start"
        );
        match self {
            Strategy::BulkSeq => bulk_seq(driver, plan).await,
            Strategy::ManySeq => many_seq(driver, plan).await,
            Strategy::BulkPar | Strategy::ManyPar => parallel(driver, plan, self.mode()).await,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = BenchError;

    /// Accepts the bare name in any case, optionally behind a `/test/` prefix.
    fn from_str(s: &str) -> Result<Self> {
        let name = s.strip_prefix("/test/").unwrap_or(s);
        Strategy::ALL
            .into_iter()
            .find(|st| st.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| BenchError::InvalidTest(s.to_string()))
    }
}

/// Shape and table setup of one trial.
#[derive(Clone, Debug)]
pub struct TrialPlan {
    pub table: TableName,
    pub batch_count: usize,
    pub batch_size: usize,
    /// Drop and recreate existing tables before inserting.
    pub recreate: bool,
    /// Parallel workers write to one table each instead of a shared one.
    pub separate: bool,
    /// Pause between setup and the timed region.
    pub wait: Duration,
}

impl TrialPlan {
    pub fn total_rows(&self) -> usize {
        self.batch_count.saturating_mul(self.batch_size)
    }
}

/// Pure execution time of a trial, plus the error that ended it, if any.
/// The duration is meaningful even when an error is present.
#[derive(Debug)]
pub struct Measurement {
    pub elapsed: Duration,
    pub error: Option<BenchError>,
}

impl Measurement {
    fn new(elapsed: Duration, res: Result<()>) -> Self {
        Self {
            elapsed,
            error: res.err(),
        }
    }

    fn failed(e: BenchError) -> Self {
        Self::new(Duration::ZERO, Err(e))
    }
}

async fn settle(wait: Duration) {
    if !wait.is_zero() {
        debug!(wait_ms = wait.as_millis() as u64, "settle");
        tokio::time::sleep(wait).await;
    }
}

/// One connection and statement for a sequential strategy. It carries no
/// rows: sequential strategies generate theirs while submitting.
async fn sequential_task<D: Driver>(
    driver: &D,
    plan: &TrialPlan,
    mode: InsertMode,
) -> Result<Task<D::Conn>> {
    ensure_table(driver, &plan.table, plan.recreate).await?;
    settle(plan.wait).await;
    Task::create(driver, &Insert::new(plan.table.clone(), mode), 0, 0).await
}

async fn bulk_seq<D: Driver>(driver: &D, plan: &TrialPlan) -> Measurement {
    let mut task = match sequential_task(driver, plan, InsertMode::Bulk).await {
        Ok(task) => task,
        Err(e) => return Measurement::failed(e),
    };

    let mut elapsed = Duration::ZERO;
    let res = submit_bulk(&mut task, plan.total_rows(), &mut elapsed).await;
    task.close().await;
    Measurement::new(elapsed, res)
}

async fn submit_bulk<C: Connection>(
    task: &mut Task<C>,
    num_rows: usize,
    elapsed: &mut Duration,
) -> Result<()> {
    for i in 0..num_rows {
        let row = row::row(i as u64);
        let t = Instant::now();
        task.conn.exec(&mut task.stmt, &row).await?;
        *elapsed += t.elapsed();
    }
    let t = Instant::now();
    task.conn.flush(&mut task.stmt).await?;
    *elapsed += t.elapsed();
    Ok(())
}

async fn many_seq<D: Driver>(driver: &D, plan: &TrialPlan) -> Measurement {
    let mut task = match sequential_task(driver, plan, InsertMode::Many).await {
        Ok(task) => task,
        Err(e) => return Measurement::failed(e),
    };

    let mut elapsed = Duration::ZERO;
    let res = submit_many(&mut task, plan.batch_count, plan.batch_size, &mut elapsed).await;
    task.close().await;
    Measurement::new(elapsed, res)
}

async fn submit_many<C: Connection>(
    task: &mut Task<C>,
    batch_count: usize,
    batch_size: usize,
    elapsed: &mut Duration,
) -> Result<()> {
    for i in 0..batch_count {
        let rows = row::rows(i, batch_size);
        let t = Instant::now();
        task.conn.exec_many(&mut task.stmt, &rows).await?;
        *elapsed += t.elapsed();
    }
    Ok(())
}

async fn parallel<D: Driver>(driver: &D, plan: &TrialPlan, mode: InsertMode) -> Measurement {
    let tasks = match parallel_tasks(driver, plan, mode).await {
        Ok(tasks) => tasks,
        Err(e) => return Measurement::failed(e),
    };
    settle(plan.wait).await;

    let start = Instant::now();
    let handles: Vec<_> = tasks
        .into_iter()
        .map(|task| tokio::spawn(work(task, mode)))
        .collect();
    let mut joined = Vec::with_capacity(handles.len());
    for handle in handles {
        joined.push(handle.await);
    }
    let elapsed = start.elapsed();

    // Slots are scanned in creation order; the last one holding an error wins.
    let mut error = None;
    for (i, slot) in joined.into_iter().enumerate() {
        match slot {
            Ok(mut task) => {
                if let Some(e) = task.err.take() {
                    error = Some(e);
                }
                task.close().await;
            }
            Err(e) => {
                error = Some(BenchError::Execution(format!("worker {i} aborted: {e}")));
            }
        }
    }
    Measurement { elapsed, error }
}

async fn parallel_tasks<D: Driver>(
    driver: &D,
    plan: &TrialPlan,
    mode: InsertMode,
) -> Result<Vec<Task<D::Conn>>> {
    if plan.separate {
        for i in 0..plan.batch_count {
            ensure_table(driver, &plan.table.for_worker(i), plan.recreate).await?;
        }
    } else {
        ensure_table(driver, &plan.table, plan.recreate).await?;
    }

    let table_for = |i: usize| {
        if plan.separate {
            plan.table.for_worker(i)
        } else {
            plan.table.clone()
        }
    };
    create_tasks(
        driver,
        |i| Insert::new(table_for(i), mode),
        plan.batch_count,
        plan.batch_size,
    )
    .await
}

/// Body of one parallel worker. A panic while submitting is caught and kept
/// as the task's error, so the task always comes back to be closed.
async fn work<C: Connection>(mut task: Task<C>, mode: InsertMode) -> Task<C> {
    let outcome = AssertUnwindSafe(submit(&mut task, mode)).catch_unwind().await;
    if let Err(panic) = outcome {
        task.err = Some(BenchError::Execution(format!(
            "worker {} panicked: {}",
            task.index,
            panic_message(panic.as_ref())
        )));
    }
    task
}

/// Submits the task's rows. It keeps going after a failure and leaves the
/// last error in the task.
async fn submit<C: Connection>(task: &mut Task<C>, mode: InsertMode) {
    match mode {
        InsertMode::Bulk => {
            for row in &task.rows {
                if let Err(e) = task.conn.exec(&mut task.stmt, row).await {
                    task.err = Some(e);
                }
            }
            if let Err(e) = task.conn.flush(&mut task.stmt).await {
                task.err = Some(e);
            }
        }
        InsertMode::Many => {
            if let Err(e) = task.conn.exec_many(&mut task.stmt, &task.rows).await {
                task.err = Some(e);
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names() {
        assert_eq!("BulkSeq".parse::<Strategy>().unwrap(), Strategy::BulkSeq);
        assert_eq!("manypar".parse::<Strategy>().unwrap(), Strategy::ManyPar);
        assert_eq!("/test/BulkPar".parse::<Strategy>().unwrap(), Strategy::BulkPar);
        assert!(matches!(
            "Bulk".parse::<Strategy>(),
            Err(BenchError::InvalidTest(_))
        ));
    }

    #[test]
    fn report_order() {
        let names: Vec<_> = Strategy::ALL.iter().map(|s| s.to_string()).collect();
        assert_eq!(names, ["BulkSeq", "ManySeq", "BulkPar", "ManyPar"]);
    }

    #[test]
    fn modes() {
        assert_eq!(Strategy::BulkPar.mode(), InsertMode::Bulk);
        assert_eq!(Strategy::ManySeq.mode(), InsertMode::Many);
    }
}
