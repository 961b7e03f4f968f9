//! Benchmarks for sub-task DAG batch resolution.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use heike::domain::models::SubTask;
use heike::services::resolve_execution_batches;

fn chain(n: usize) -> Vec<SubTask> {
    (0..n)
        .map(|i| {
            let task = SubTask::new(format!("t{i:04}"), "chained work");
            if i == 0 {
                task
            } else {
                task.with_dependencies(vec![format!("t{:04}", i - 1)])
            }
        })
        .collect()
}

fn wide(n: usize) -> Vec<SubTask> {
    (0..n)
        .map(|i| SubTask::new(format!("t{i:04}"), "independent work"))
        .collect()
}

fn layered(layers: usize, width: usize) -> Vec<SubTask> {
    let mut tasks = Vec::with_capacity(layers * width);
    for layer in 0..layers {
        for slot in 0..width {
            let mut task = SubTask::new(format!("l{layer:02}s{slot:02}"), "layered work");
            if layer > 0 {
                task = task.with_dependencies(
                    (0..width).map(|d| format!("l{:02}s{d:02}", layer - 1)).collect(),
                );
            }
            tasks.push(task);
        }
    }
    tasks
}

fn bench_resolve_batches(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_execution_batches");

    for size in [10usize, 100, 500] {
        group.bench_with_input(BenchmarkId::new("chain", size), &size, |b, &size| {
            let tasks = chain(size);
            b.iter(|| resolve_execution_batches(black_box(&tasks)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("wide", size), &size, |b, &size| {
            let tasks = wide(size);
            b.iter(|| resolve_execution_batches(black_box(&tasks)).unwrap());
        });
    }

    group.bench_function("layered_10x10", |b| {
        let tasks = layered(10, 10);
        b.iter(|| resolve_execution_batches(black_box(&tasks)).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_resolve_batches);
criterion_main!(benches);
