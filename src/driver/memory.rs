//! In-process store behind the driver traits.
//!
//! Used for dry runs of the CLI and as the store under test. Every round trip
//! can be given an artificial latency, and the store can be told to refuse
//! connections past a limit or to reject specific row ids, so the engine's
//! timing and failure paths can be observed without a database.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{Connection, Connector, Driver, DriverSettings};
use crate::error::{BenchError, Result};
use crate::row::Row;
use crate::table::{Insert, InsertMode, TableName};

#[derive(Clone, Debug, Default)]
pub struct MemoryOptions {
    /// Upper bound for the effective bulk size.
    pub max_bulk_size: Option<usize>,
    /// Simulated duration of every round trip to the store.
    pub latency: Duration,
    /// Number of connections after which `connect` fails.
    pub connect_limit: Option<usize>,
    /// Row ids the store refuses to insert.
    pub reject_rows: HashSet<i64>,
    /// Row ids whose submission panics the submitting task.
    pub panic_rows: HashSet<i64>,
}

#[derive(Default)]
pub struct MemoryState {
    options: MemoryOptions,
    tables: Mutex<HashMap<TableName, Vec<Row>>>,
    schemas: Mutex<HashSet<String>>,
    acquired: AtomicUsize,
    released: AtomicUsize,
    prepared: AtomicUsize,
    finalized: AtomicUsize,
    round_trips: AtomicUsize,
    tables_created: AtomicUsize,
}

impl MemoryState {
    fn tables(&self) -> MutexGuard<'_, HashMap<TableName, Vec<Row>>> {
        // A poisoned lock only means a panicking test thread; the map is intact.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn schemas(&self) -> MutexGuard<'_, HashSet<String>> {
        self.schemas.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn prepared(&self) -> usize {
        self.prepared.load(Ordering::SeqCst)
    }

    pub fn finalized(&self) -> usize {
        self.finalized.load(Ordering::SeqCst)
    }

    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    pub fn tables_created(&self) -> usize {
        self.tables_created.load(Ordering::SeqCst)
    }

    /// Rows stored in `table`, in arrival order.
    pub fn rows(&self, table: &TableName) -> Vec<Row> {
        self.tables().get(table).cloned().unwrap_or_default()
    }

    /// Appends rows to an existing table, bypassing any statement.
    pub fn insert_rows(&self, table: &TableName, rows: Vec<Row>) {
        if let Some(stored) = self.tables().get_mut(table) {
            stored.extend(rows);
        }
    }

    async fn round_trip(&self) {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
        if !self.options.latency.is_zero() {
            tokio::time::sleep(self.options.latency).await;
        }
    }

    fn check(&self, row: &Row) -> Result<()> {
        if self.options.panic_rows.contains(&row.device_id) {
            panic!("row {} panicked", row.device_id);
        }
        if self.options.reject_rows.contains(&row.device_id) {
            return Err(BenchError::Execution(format!("row {} rejected", row.device_id)));
        }
        Ok(())
    }

    fn append(&self, table: &TableName, rows: &[Row]) -> Result<()> {
        let mut tables = self.tables();
        let stored = tables
            .get_mut(table)
            .ok_or_else(|| BenchError::Execution(format!("table {table} not found")))?;
        stored.extend_from_slice(rows);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryConnector {
    state: Arc<MemoryState>,
}

impl MemoryConnector {
    pub fn new(options: MemoryOptions) -> Self {
        Self {
            state: Arc::new(MemoryState {
                options,
                ..MemoryState::default()
            }),
        }
    }

    pub fn state(&self) -> &Arc<MemoryState> {
        &self.state
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Driver = MemoryDriver;

    async fn open(&self, settings: &DriverSettings) -> Result<MemoryDriver> {
        let mut bulk_size = settings.bulk_size.max(1);
        if let Some(max) = self.state.options.max_bulk_size {
            bulk_size = bulk_size.min(max);
        }
        Ok(MemoryDriver {
            state: self.state.clone(),
            bulk_size,
        })
    }
}

pub struct MemoryDriver {
    state: Arc<MemoryState>,
    bulk_size: usize,
}

#[async_trait]
impl Driver for MemoryDriver {
    type Conn = MemoryConnection;

    fn bulk_size(&self) -> usize {
        self.bulk_size
    }

    async fn connect(&self) -> Result<MemoryConnection> {
        if let Some(limit) = self.state.options.connect_limit {
            if self.state.acquired() >= limit {
                return Err(BenchError::Connection(format!(
                    "connection limit of {limit} reached"
                )));
            }
        }
        let id = self.state.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryConnection {
            id,
            state: self.state.clone(),
            bulk_size: self.bulk_size,
        })
    }

    async fn table_exists(&self, table: &TableName) -> Result<bool> {
        Ok(self.state.tables().contains_key(table))
    }

    async fn create_table(&self, table: &TableName) -> Result<()> {
        let mut tables = self.state.tables();
        if tables.contains_key(table) {
            return Err(BenchError::Table(format!("table {table} already exists")));
        }
        tables.insert(table.clone(), Vec::new());
        self.state.tables_created.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn drop_table(&self, table: &TableName) -> Result<()> {
        self.state
            .tables()
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| BenchError::Table(format!("table {table} not found")))
    }

    async fn create_schema(&self, schema: &str) -> Result<()> {
        if !self.state.schemas().insert(schema.to_string()) {
            return Err(BenchError::Table(format!("schema {schema} already exists")));
        }
        Ok(())
    }

    async fn drop_schema(&self, schema: &str, cascade: bool) -> Result<()> {
        let mut tables = self.state.tables();
        let in_use = tables.keys().any(|t| t.schema == schema);
        if in_use && !cascade {
            return Err(BenchError::Table(format!("schema {schema} is not empty")));
        }
        if !self.state.schemas().remove(schema) {
            return Err(BenchError::Table(format!("schema {schema} not found")));
        }
        tables.retain(|t, _| t.schema != schema);
        Ok(())
    }

    async fn count_rows(&self, table: &TableName) -> Result<u64> {
        self.state
            .tables()
            .get(table)
            .map(|rows| rows.len() as u64)
            .ok_or_else(|| BenchError::Table(format!("table {table} not found")))
    }

    async fn delete_rows(&self, table: &TableName) -> Result<u64> {
        self.state
            .tables()
            .get_mut(table)
            .map(|rows| rows.drain(..).count() as u64)
            .ok_or_else(|| BenchError::Table(format!("table {table} not found")))
    }

    async fn close(&self) {
        debug!(bulk_size = self.bulk_size, "memory_driver_closed");
    }
}

pub struct MemoryStatement {
    insert: Insert,
    buffer: Vec<Row>,
    bulk_size: usize,
}

impl MemoryStatement {
    async fn flush_buffer(&mut self, state: &MemoryState) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        state.round_trip().await;
        let rows = std::mem::take(&mut self.buffer);
        state.append(&self.insert.table, &rows)
    }
}

pub struct MemoryConnection {
    id: usize,
    state: Arc<MemoryState>,
    bulk_size: usize,
}

#[async_trait]
impl Connection for MemoryConnection {
    type Statement = MemoryStatement;

    async fn prepare(&mut self, insert: &Insert) -> Result<MemoryStatement> {
        if !self.state.tables().contains_key(&insert.table) {
            return Err(BenchError::Prepare(format!("table {} not found", insert.table)));
        }
        self.state.prepared.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryStatement {
            insert: insert.clone(),
            buffer: Vec::new(),
            bulk_size: self.bulk_size,
        })
    }

    async fn exec(&mut self, stmt: &mut MemoryStatement, row: &Row) -> Result<()> {
        self.state.check(row)?;
        match stmt.insert.mode {
            InsertMode::Bulk => {
                stmt.buffer.push(row.clone());
                if stmt.buffer.len() >= stmt.bulk_size {
                    stmt.flush_buffer(&self.state).await?;
                }
                Ok(())
            }
            InsertMode::Many => {
                self.state.round_trip().await;
                self.state.append(&stmt.insert.table, std::slice::from_ref(row))
            }
        }
    }

    async fn exec_many(&mut self, stmt: &mut MemoryStatement, rows: &[Row]) -> Result<()> {
        rows.iter().try_for_each(|row| self.state.check(row))?;
        self.state.round_trip().await;
        self.state.append(&stmt.insert.table, rows)
    }

    async fn flush(&mut self, stmt: &mut MemoryStatement) -> Result<()> {
        stmt.flush_buffer(&self.state).await
    }

    async fn finalize(&mut self, stmt: MemoryStatement) -> Result<()> {
        self.state.finalized.fetch_add(1, Ordering::SeqCst);
        if !stmt.buffer.is_empty() {
            return Err(BenchError::Teardown(format!(
                "{} buffered rows discarded on connection {}",
                stmt.buffer.len(),
                self.id
            )));
        }
        Ok(())
    }

    async fn release(self) -> Result<()> {
        self.state.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::rows;

    fn table() -> TableName {
        TableName::new("test", "message")
    }

    async fn open(options: MemoryOptions, bulk_size: usize) -> (MemoryConnector, MemoryDriver) {
        let connector = MemoryConnector::new(options);
        let driver = connector.open(&DriverSettings::new(bulk_size)).await.unwrap();
        driver.create_table(&table()).await.unwrap();
        (connector, driver)
    }

    #[tokio::test]
    async fn bulk_statement_flushes_at_bulk_size() {
        let (connector, driver) = open(MemoryOptions::default(), 4).await;
        let mut conn = driver.connect().await.unwrap();
        let mut stmt = conn
            .prepare(&Insert::new(table(), InsertMode::Bulk))
            .await
            .unwrap();

        for r in rows(0, 10) {
            conn.exec(&mut stmt, &r).await.unwrap();
        }
        assert_eq!(connector.state().rows(&table()).len(), 8);
        conn.flush(&mut stmt).await.unwrap();
        assert_eq!(connector.state().rows(&table()).len(), 10);
        assert_eq!(connector.state().round_trips(), 3);

        conn.finalize(stmt).await.unwrap();
        conn.release().await.unwrap();
        assert_eq!(connector.state().released(), 1);
    }

    #[tokio::test]
    async fn bulk_size_is_clamped() {
        let options = MemoryOptions {
            max_bulk_size: Some(100),
            ..MemoryOptions::default()
        };
        let (_, driver) = open(options, 10_000).await;
        assert_eq!(driver.bulk_size(), 100);
    }

    #[tokio::test]
    async fn prepare_requires_table() {
        let (_, driver) = open(MemoryOptions::default(), 4).await;
        let mut conn = driver.connect().await.unwrap();
        let missing = Insert::new(TableName::new("test", "missing"), InsertMode::Many);
        assert!(matches!(conn.prepare(&missing).await, Err(BenchError::Prepare(_))));
    }

    #[tokio::test]
    async fn rejected_rows_fail_execution() {
        let options = MemoryOptions {
            reject_rows: HashSet::from([2]),
            ..MemoryOptions::default()
        };
        let (connector, driver) = open(options, 4).await;
        let mut conn = driver.connect().await.unwrap();
        let mut stmt = conn
            .prepare(&Insert::new(table(), InsertMode::Many))
            .await
            .unwrap();
        let err = conn.exec_many(&mut stmt, &rows(0, 5)).await.unwrap_err();
        assert_eq!(err.to_string(), "execution error: row 2 rejected");
        assert!(connector.state().rows(&table()).is_empty());
    }

    #[tokio::test]
    async fn connect_limit() {
        let options = MemoryOptions {
            connect_limit: Some(1),
            ..MemoryOptions::default()
        };
        let (_, driver) = open(options, 4).await;
        let _first = driver.connect().await.unwrap();
        assert!(matches!(driver.connect().await, Err(BenchError::Connection(_))));
    }

    #[tokio::test]
    async fn schema_drop_needs_cascade_when_used() {
        let (connector, driver) = open(MemoryOptions::default(), 4).await;
        driver.create_schema("test").await.unwrap();
        assert!(driver.drop_schema("test", false).await.is_err());
        driver.drop_schema("test", true).await.unwrap();
        assert!(!driver.table_exists(&table()).await.unwrap());
        assert!(connector.state().rows(&table()).is_empty());
    }

    #[tokio::test]
    async fn delete_and_count() {
        let (connector, driver) = open(MemoryOptions::default(), 4).await;
        connector.state().insert_rows(&table(), rows(0, 3));
        assert_eq!(driver.count_rows(&table()).await.unwrap(), 3);
        assert_eq!(driver.delete_rows(&table()).await.unwrap(), 3);
        assert_eq!(driver.count_rows(&table()).await.unwrap(), 0);
    }
}
