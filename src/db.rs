//! Small command set for schema and table maintenance outside of trials.

use std::fmt;

use tracing::info;

use crate::driver::{Connector, Driver, DriverSettings};
use crate::table::TableName;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbCommand {
    CreateSchema,
    DropSchema { cascade: bool },
    CreateTable,
    DropTable,
    DeleteRows,
    CountRows,
}

impl DbCommand {
    fn object(&self) -> &'static str {
        match self {
            DbCommand::CreateSchema | DbCommand::DropSchema { .. } => "schema",
            _ => "table",
        }
    }

    fn op(&self) -> &'static str {
        match self {
            DbCommand::CreateSchema | DbCommand::CreateTable => "Create",
            DbCommand::DropSchema { .. } | DbCommand::DropTable => "Drop",
            DbCommand::DeleteRows => "Delete rows",
            DbCommand::CountRows => "Count rows",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DbResult {
    pub command: DbCommand,
    pub object_name: String,
    /// Rows counted or deleted; `None` for DDL.
    pub rows: Option<u64>,
    pub error: Option<String>,
}

impl fmt::Display for DbResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (op, obj, name) = (self.command.op(), self.command.object(), &self.object_name);
        match (&self.error, self.rows) {
            (Some(e), _) => write!(f, "{op} {obj} {name} error: {e}"),
            (None, Some(n)) => write!(f, "{op} {obj} {name}: {n} rows"),
            (None, None) => write!(f, "{op} {obj} {name}: ok"),
        }
    }
}

/// Runs `command` against `table` (or its schema) on a short-lived driver.
pub async fn run<C: Connector>(connector: &C, command: DbCommand, table: &TableName) -> DbResult {
    let object_name = match command {
        DbCommand::CreateSchema | DbCommand::DropSchema { .. } => table.schema.clone(),
        _ => table.to_string(),
    };
    let mut result = DbResult {
        command,
        object_name,
        rows: None,
        error: None,
    };

    let driver = match connector.open(&DriverSettings::new(1)).await {
        Ok(driver) => driver,
        Err(e) => {
            result.error = Some(e.to_string());
            return result;
        }
    };
    let res = match command {
        DbCommand::CreateSchema => driver.create_schema(&table.schema).await.map(|_| None),
        DbCommand::DropSchema { cascade } => driver
            .drop_schema(&table.schema, cascade)
            .await
            .map(|_| None),
        DbCommand::CreateTable => driver.create_table(table).await.map(|_| None),
        DbCommand::DropTable => driver.drop_table(table).await.map(|_| None),
        DbCommand::DeleteRows => driver.delete_rows(table).await.map(Some),
        DbCommand::CountRows => driver.count_rows(table).await.map(Some),
    };
    driver.close().await;

    match res {
        Ok(rows) => result.rows = rows,
        Err(e) => result.error = Some(e.to_string()),
    }
    info!(result = %result, "db_command");
    result
}
