//! Command line and environment configuration.
//!
//! Everything is parsed once in `main` and handed to the engine as plain
//! values; every flag falls back to an environment variable, then a default.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::db::DbCommand;
use crate::engine::EngineConfig;
use crate::params::{ParameterSet, DEFAULT_PARAMETERS};
use crate::strategy::Strategy;
use crate::table::TableName;

pub const DEFAULT_DSN: &str = "mysql://root@127.0.0.1:4000/test";
pub const DEFAULT_SCHEMA: &str = "test";
pub const DEFAULT_TABLE: &str = "message";

#[derive(Parser, Debug)]
#[command(author, version, about = "Insert throughput benchmark: bulk vs. many, sequential vs. parallel")]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DriverKind {
    /// MySQL / TiDB via sqlx
    Mysql,
    /// In-process store, for dry runs
    Memory,
}

#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Database url
    #[arg(long, env = "INSERT_BENCH_DSN", default_value = DEFAULT_DSN, global = true)]
    pub dsn: String,

    /// Data store backend
    #[arg(long, env = "INSERT_BENCH_DRIVER", value_enum, default_value_t = DriverKind::Mysql, global = true)]
    pub driver: DriverKind,

    /// Simulated round trip latency of the memory driver in milliseconds
    #[arg(long, env = "LATENCY_MS", default_value_t = 0, global = true)]
    pub latency_ms: u64,

    /// Schema name
    #[arg(long, env = "SCHEMANAME", default_value = DEFAULT_SCHEMA, global = true)]
    pub schema_name: String,

    /// Table name
    #[arg(long, env = "TABLENAME", default_value = DEFAULT_TABLE, global = true)]
    pub table_name: String,

    /// Batch count for single test runs
    #[arg(long, env = "BATCHCOUNT", default_value_t = 10, global = true)]
    pub batch_count: usize,

    /// Batch size for single test runs
    #[arg(long, env = "BATCHSIZE", default_value_t = 10_000, global = true)]
    pub batch_size: usize,

    /// Benchmark parameters as <count>x<size> pairs
    #[arg(long, env = "PARAMETERS", default_value = DEFAULT_PARAMETERS, global = true)]
    pub parameters: ParameterSet,

    /// Drop and recreate the table before every test
    #[arg(long, env = "DROP", default_value_t = false, global = true)]
    pub drop: bool,

    /// Separate tables for parallel tests
    #[arg(long, env = "SEPARATE", default_value_t = false, global = true)]
    pub separate: bool,

    /// Wait time before starting a test in seconds
    #[arg(long, env = "WAIT", default_value_t = 0, global = true)]
    pub wait: u64,

    /// Connection pool size (0 = batch count + 8)
    #[arg(long, env = "MAXCONNECTIONS", default_value_t = 0, global = true)]
    pub max_connections: u32,
}

impl Settings {
    pub fn table(&self) -> TableName {
        TableName::new(self.schema_name.clone(), self.table_name.clone())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            table: self.table(),
            drop: self.drop,
            separate: self.separate,
            wait: Duration::from_secs(self.wait),
            max_connections: self.max_connections,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one strategy once
    Test {
        /// BulkSeq, ManySeq, BulkPar or ManyPar
        strategy: Strategy,
    },
    /// Run every strategy over the parameter grid and report statistics
    Bench {
        /// Trials per strategy and parameter
        #[arg(long, env = "REPETITIONS", default_value_t = 5)]
        repetitions: usize,

        /// Strategies to run, comma separated
        #[arg(long, value_delimiter = ',', default_values_t = Strategy::ALL)]
        strategies: Vec<Strategy>,
    },
    /// Schema and table maintenance
    Db {
        #[command(subcommand)]
        command: DbSubcommand,
    },
    /// Show the parameter grid grouped by total rows
    Params,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum DbSubcommand {
    CreateSchema,
    DropSchema {
        /// Drop contained tables as well
        #[arg(long)]
        cascade: bool,
    },
    CreateTable,
    DropTable,
    DeleteRows,
    CountRows,
}

impl From<DbSubcommand> for DbCommand {
    fn from(cmd: DbSubcommand) -> Self {
        match cmd {
            DbSubcommand::CreateSchema => DbCommand::CreateSchema,
            DbSubcommand::DropSchema { cascade } => DbCommand::DropSchema { cascade },
            DbSubcommand::CreateTable => DbCommand::CreateTable,
            DbSubcommand::DropTable => DbCommand::DropTable,
            DbSubcommand::DeleteRows => DbCommand::DeleteRows,
            DbSubcommand::CountRows => DbCommand::CountRows,
        }
    }
}
