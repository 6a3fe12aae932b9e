//! Grid benchmark: every parameter of every total-rows group, every strategy,
//! repeated trials.

use tracing::info;

use crate::driver::Connector;
use crate::engine::Engine;
use crate::error::Result;
use crate::params::{Parameter, ParameterSet};
use crate::stats::{run_trials, Statistics};
use crate::strategy::Strategy;

#[derive(Clone, Debug)]
pub struct BenchRecord {
    pub total_rows: usize,
    pub parameter: Parameter,
    pub strategy: Strategy,
    pub bulk_size: usize,
    pub stats: Statistics,
}

/// Runs the grid group by group (ascending total rows), parameter by
/// parameter, strategy by strategy.
///
/// The first trial of every batch recreates the table, so each strategy starts
/// from an empty one; later repetitions only make sure it exists. A failed
/// trial aborts the whole benchmark.
pub async fn run_grid<C: Connector>(
    engine: &Engine<C>,
    params: &ParameterSet,
    strategies: &[Strategy],
    repetitions: usize,
) -> Result<Vec<BenchRecord>> {
    let mut records = Vec::new();
    for group in params.group_by_total_rows() {
        for &prm in &group {
            info!(parameter = %prm, total_rows = prm.total_rows(), "parameter_start");
            for &strategy in strategies {
                let (stats, results) = run_trials(repetitions, move |i| {
                    let req = engine.request(strategy, prm);
                    let drop = req.drop || i == 0;
                    engine.execute(req.with_drop(drop))
                })
                .await?;
                records.push(BenchRecord {
                    total_rows: prm.total_rows(),
                    parameter: prm,
                    strategy,
                    bulk_size: results.first().map_or(0, |r| r.bulk_size),
                    stats,
                });
            }
        }
    }
    Ok(records)
}
