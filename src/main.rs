use std::time::Duration;

use anyhow::{bail, Context};
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use insert_bench::bench::{run_grid, BenchRecord};
use insert_bench::config::{Cli, Command, DriverKind, Settings};
use insert_bench::db;
use insert_bench::driver::memory::{MemoryConnector, MemoryOptions};
use insert_bench::driver::mysql::MySqlConnector;
use insert_bench::driver::Connector;
use insert_bench::{Engine, Parameter, ParameterSet};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = &cli.settings;

    println!("--- insert benchmark ---");
    println!("driver         : {:?}", settings.driver);
    println!("table          : {}", settings.table());
    println!("drop           : {}", settings.drop);
    println!("separate       : {}", settings.separate);
    println!("wait           : {}s", settings.wait);
    println!("workers        : {}", std::thread::available_parallelism().map_or(1, |n| n.get()));

    match settings.driver {
        DriverKind::Mysql => {
            let connector = MySqlConnector::from_dsn(&settings.dsn).context("building mysql connector")?;
            run(connector, settings, &cli.command).await
        }
        DriverKind::Memory => {
            let connector = MemoryConnector::new(MemoryOptions {
                latency: Duration::from_millis(settings.latency_ms),
                ..MemoryOptions::default()
            });
            run(connector, settings, &cli.command).await
        }
    }
}

async fn run<C: Connector>(connector: C, settings: &Settings, command: &Command) -> anyhow::Result<()> {
    match command {
        Command::Test { strategy } => {
            let engine = Engine::new(connector, settings.engine_config());
            let prm = Parameter::new(settings.batch_count, settings.batch_size);
            let result = engine.execute(engine.request(*strategy, prm)).await;
            println!("{result}");
            if !result.is_ok() {
                bail!("{} failed", strategy);
            }
        }
        Command::Bench {
            repetitions,
            strategies,
        } => {
            println!("parameters     : {}", settings.parameters);
            println!("repetitions    : {}", repetitions);
            let engine = Engine::new(connector, settings.engine_config());
            let records = run_grid(&engine, &settings.parameters, strategies, *repetitions)
                .await
                .context("benchmark aborted")?;
            print_report(&records);
        }
        Command::Db { command } => {
            let result = db::run(&connector, (*command).into(), &settings.table()).await;
            println!("{result}");
            if let Some(e) = result.error {
                bail!(e);
            }
        }
        Command::Params => print_params(&settings.parameters),
    }
    Ok(())
}

fn print_params(params: &ParameterSet) {
    println!();
    println!("{:<12} parameters", "total rows");
    for group in params.group_by_total_rows() {
        let total = group.iter().next().map_or(0, |p| p.total_rows());
        println!("{:<12} {}", total, group);
    }
}

fn print_report(records: &[BenchRecord]) {
    println!();
    println!("=== Summary ({}) ===", Local::now().format("%Y-%m-%d %H:%M:%S"));
    let mut last_total = None;
    for r in records {
        if last_total != Some(r.total_rows) {
            println!();
            println!("--- {} rows ---", r.total_rows);
            println!(
                "{:<10} {:<12} {:>8} {:>12} {:>12} {:>12} {:>12}",
                "test", "batch", "bulk", "avgsec/op", "minsec/op", "maxsec/op", "medsec/op"
            );
            last_total = Some(r.total_rows);
        }
        println!(
            "{:<10} {:<12} {:>8} {:>12.6} {:>12.6} {:>12.6} {:>12.6}",
            r.strategy.name(),
            r.parameter.to_string(),
            r.bulk_size,
            r.stats.mean_secs(),
            r.stats.min_secs(),
            r.stats.max_secs(),
            r.stats.median_secs()
        );
    }
}
