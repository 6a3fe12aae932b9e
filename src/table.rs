use std::fmt;

use tracing::info;

use crate::driver::Driver;
use crate::error::Result;

/// Column name and SQL type of the benchmark table, in insert order.
pub const COLUMNS: [(&str, &str); 10] = [
    ("deviceid", "INTEGER"),
    ("temperatur", "DOUBLE"),
    ("humidity", "DOUBLE"),
    ("co2", "DOUBLE"),
    ("co", "DOUBLE"),
    ("lpg", "DOUBLE"),
    ("smoke", "DOUBLE"),
    ("presence", "DOUBLE"),
    ("light", "DOUBLE"),
    ("sound", "DOUBLE"),
];

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TableName {
    pub schema: String,
    pub table: String,
}

impl TableName {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Table used by worker `i` when every worker writes to its own table.
    pub fn for_worker(&self, i: usize) -> Self {
        Self::new(self.schema.clone(), format!("{}_{}", self.table, i))
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertMode {
    /// Rows go into a driver-side buffer that flushes at the bulk size.
    Bulk,
    /// A whole row array is submitted in one call.
    Many,
}

/// What a statement is prepared for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Insert {
    pub table: TableName,
    pub mode: InsertMode,
}

impl Insert {
    pub fn new(table: TableName, mode: InsertMode) -> Self {
        Self { table, mode }
    }
}

/// Creates `table` if absent. An existing table is dropped and recreated when
/// `recreate` is set and left alone otherwise.
///
/// Recreation is the only reset path: deleting millions of rows can exhaust
/// the store's memory.
pub async fn ensure_table<D: Driver>(driver: &D, table: &TableName, recreate: bool) -> Result<()> {
    let exists = driver.table_exists(table).await?;
    match (exists, recreate) {
        (true, true) => {
            driver.drop_table(table).await?;
            driver.create_table(table).await?;
            info!(table = %table, "table_recreated");
        }
        (false, _) => {
            driver.create_table(table).await?;
            info!(table = %table, "table_created");
        }
        (true, false) => {}
    }
    Ok(())
}
