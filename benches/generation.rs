//! Criterion benchmarks for the untimed parts of a trial: row generation and
//! parameter handling, plus a full trial against the in-memory driver.
//!
//! Run with: `cargo bench --bench generation`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use insert_bench::driver::memory::MemoryConnector;
use insert_bench::params::DEFAULT_PARAMETERS;
use insert_bench::table::TableName;
use insert_bench::{Engine, EngineConfig, Parameter, ParameterSet, Strategy};

fn bench_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("rows");

    for size in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| insert_bench::row::rows(black_box(3), size));
        });
    }

    group.finish();
}

fn bench_parameters(c: &mut Criterion) {
    c.bench_function("parse_parameters", |b| {
        b.iter(|| black_box(DEFAULT_PARAMETERS).parse::<ParameterSet>().unwrap());
    });

    let params: ParameterSet = DEFAULT_PARAMETERS.parse().unwrap();
    c.bench_function("group_by_total_rows", |b| {
        b.iter(|| black_box(&params).group_by_total_rows());
    });
}

fn bench_memory_trial(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let engine = Engine::new(
        MemoryConnector::default(),
        EngineConfig::new(TableName::new("test", "message")),
    );

    let mut group = c.benchmark_group("memory_trial");
    for strategy in Strategy::ALL {
        group.bench_function(strategy.name(), |b| {
            b.iter(|| {
                let req = engine.request(strategy, Parameter::new(4, 1000)).with_drop(true);
                let result = rt.block_on(engine.execute(req));
                assert!(result.is_ok(), "{result}");
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rows, bench_parameters, bench_memory_trial);
criterion_main!(benches);
