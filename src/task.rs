//! Units of work for the parallel strategies.
//!
//! A task owns one connection, one statement prepared on it and the rows it
//! is going to submit. Each task is driven by exactly one worker, so nothing
//! in it needs synchronization.

use tracing::warn;

use crate::driver::{Connection, Driver};
use crate::error::{BenchError, Result};
use crate::row::{self, Row};
use crate::table::Insert;

pub struct Task<C: Connection> {
    pub index: usize,
    pub conn: C,
    pub stmt: C::Statement,
    pub rows: Vec<Row>,
    /// Terminal error of the worker; the last failure wins.
    pub err: Option<BenchError>,
}

impl<C: Connection> Task<C> {
    /// Acquires a connection, prepares `insert` on it and generates the rows
    /// of block `index`. The connection is released again if preparing fails.
    pub async fn create<D>(driver: &D, insert: &Insert, index: usize, size: usize) -> Result<Self>
    where
        D: Driver<Conn = C>,
    {
        let mut conn = driver.connect().await?;
        let stmt = match conn.prepare(insert).await {
            Ok(stmt) => stmt,
            Err(e) => {
                if let Err(te) = conn.release().await {
                    warn!(task = index, error = %te, "task_release_failed");
                }
                return Err(e);
            }
        };
        Ok(Self {
            index,
            conn,
            stmt,
            rows: row::rows(index, size),
            err: None,
        })
    }

    /// Finalizes the statement, then releases the connection. Failures are
    /// logged and swallowed.
    pub async fn close(self) {
        let Task {
            index,
            mut conn,
            stmt,
            ..
        } = self;
        if let Err(e) = conn.finalize(stmt).await {
            warn!(task = index, error = %e, "task_finalize_failed");
        }
        if let Err(e) = conn.release().await {
            warn!(task = index, error = %e, "task_release_failed");
        }
    }
}

/// Creates `batch_count` tasks one after the other, task `i` preparing
/// `insert_for(i)`. If any of them fails, the tasks built so far are closed
/// and only the error is returned.
pub async fn create_tasks<D, F>(
    driver: &D,
    mut insert_for: F,
    batch_count: usize,
    batch_size: usize,
) -> Result<Vec<Task<D::Conn>>>
where
    D: Driver,
    F: FnMut(usize) -> Insert,
{
    let mut tasks = Vec::with_capacity(batch_count);
    for i in 0..batch_count {
        let insert = insert_for(i);
        match Task::create(driver, &insert, i, batch_size).await {
            Ok(task) => tasks.push(task),
            Err(e) => {
                close_tasks(tasks).await;
                return Err(e);
            }
        }
    }
    Ok(tasks)
}

pub async fn close_tasks<C: Connection>(tasks: Vec<Task<C>>) {
    for task in tasks {
        task.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::memory::{MemoryConnector, MemoryOptions};
    use crate::driver::{Connector, DriverSettings};
    use crate::table::{InsertMode, TableName};

    fn table() -> TableName {
        TableName::new("test", "message")
    }

    #[tokio::test]
    async fn task_holds_its_block() {
        let connector = MemoryConnector::default();
        let driver = connector.open(&DriverSettings::new(10)).await.unwrap();
        driver.create_table(&table()).await.unwrap();

        let task = Task::create(&driver, &Insert::new(table(), InsertMode::Many), 2, 5)
            .await
            .unwrap();
        let ids: Vec<i64> = task.rows.iter().map(|r| r.device_id).collect();
        assert_eq!(ids, vec![10, 11, 12, 13, 14]);
        assert!(task.err.is_none());

        task.close().await;
        assert_eq!(connector.state().finalized(), 1);
        assert_eq!(connector.state().released(), 1);
    }

    #[tokio::test]
    async fn failed_prepare_releases_connection() {
        let connector = MemoryConnector::default();
        let driver = connector.open(&DriverSettings::new(10)).await.unwrap();

        let res = Task::create(&driver, &Insert::new(table(), InsertMode::Bulk), 0, 5).await;
        assert!(matches!(res, Err(BenchError::Prepare(_))));
        assert_eq!(connector.state().acquired(), 1);
        assert_eq!(connector.state().released(), 1);
    }

    #[tokio::test]
    async fn partial_creation_closes_built_tasks() {
        let connector = MemoryConnector::new(MemoryOptions {
            connect_limit: Some(2),
            ..MemoryOptions::default()
        });
        let driver = connector.open(&DriverSettings::new(10)).await.unwrap();
        driver.create_table(&table()).await.unwrap();

        let res = create_tasks(&driver, |_| Insert::new(table(), InsertMode::Many), 4, 3).await;
        assert!(matches!(res, Err(BenchError::Connection(_))));
        assert_eq!(connector.state().acquired(), 2);
        assert_eq!(connector.state().released(), 2);
        assert_eq!(connector.state().finalized(), 2);
    }
}
