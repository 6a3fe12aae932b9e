//! Data-access capability the engine runs against.
//!
//! The engine never speaks a wire protocol or SQL dialect itself: it opens a
//! [`Driver`] through a [`Connector`], takes exclusive [`Connection`]s from it,
//! prepares inserts on them and submits rows.

use async_trait::async_trait;

use crate::error::Result;
use crate::row::Row;
use crate::table::{Insert, TableName};

pub mod memory;
pub mod mysql;

const DEFAULT_MAX_CONNECTIONS: u32 = 8;

/// Per-trial driver settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriverSettings {
    /// Requested bulk flush threshold in rows. Drivers may clamp it.
    pub bulk_size: usize,
    pub max_connections: u32,
}

impl DriverSettings {
    pub fn new(bulk_size: usize) -> Self {
        Self {
            bulk_size,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }
}

#[async_trait]
pub trait Connector: Send + Sync {
    type Driver: Driver;

    async fn open(&self, settings: &DriverSettings) -> Result<Self::Driver>;
}

#[async_trait]
pub trait Driver: Send + Sync + 'static {
    type Conn: Connection;

    /// Effective bulk flush threshold.
    fn bulk_size(&self) -> usize;

    /// Acquires one exclusive connection.
    async fn connect(&self) -> Result<Self::Conn>;

    async fn table_exists(&self, table: &TableName) -> Result<bool>;
    async fn create_table(&self, table: &TableName) -> Result<()>;
    async fn drop_table(&self, table: &TableName) -> Result<()>;
    async fn create_schema(&self, schema: &str) -> Result<()>;
    async fn drop_schema(&self, schema: &str, cascade: bool) -> Result<()>;
    async fn count_rows(&self, table: &TableName) -> Result<u64>;
    async fn delete_rows(&self, table: &TableName) -> Result<u64>;

    async fn close(&self);
}

#[async_trait]
pub trait Connection: Send + 'static {
    type Statement: Send + 'static;

    async fn prepare(&mut self, insert: &Insert) -> Result<Self::Statement>;

    /// Submits one row. Bulk statements buffer it and flush on their own once
    /// the bulk size is reached.
    async fn exec(&mut self, stmt: &mut Self::Statement, row: &Row) -> Result<()>;

    /// Submits a whole row array in one call.
    async fn exec_many(&mut self, stmt: &mut Self::Statement, rows: &[Row]) -> Result<()>;

    /// Sends whatever a bulk statement still buffers.
    async fn flush(&mut self, stmt: &mut Self::Statement) -> Result<()>;

    async fn finalize(&mut self, stmt: Self::Statement) -> Result<()>;

    /// Hands the connection back to the driver.
    async fn release(self) -> Result<()>;
}
