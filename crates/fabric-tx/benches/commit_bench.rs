// Benchmarks for the transaction manager
// Measures start/commit throughput and conflict checks against retained change-sets

use std::collections::HashSet;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use fabric_tx::{InMemoryTransactionManager, TransactionSystemClient};

fn changes(prefix: &str, count: usize) -> HashSet<Vec<u8>> {
    (0..count)
        .map(|i| format!("{}/row-{}", prefix, i).into_bytes())
        .collect()
}

fn bench_start_commit(c: &mut Criterion) {
    let manager = InMemoryTransactionManager::new();
    let writes = changes("table", 4);

    c.bench_function("start_commit", |b| {
        b.iter(|| {
            let tx = manager.start_short();
            manager.can_commit(&tx, black_box(&writes)).unwrap();
            manager.commit(&tx).unwrap();
        })
    });
}

fn bench_conflict_check_with_retained_change_sets(c: &mut Criterion) {
    let mut group = c.benchmark_group("conflict_check_with_retained_change_sets");

    for retained in [10usize, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(retained),
            &retained,
            |b, &retained| {
                let manager = InMemoryTransactionManager::new();
                // started first, so every later change-set is checked against it
                let reader = manager.start_short();
                for i in 0..retained {
                    let tx = manager.start_short();
                    manager
                        .can_commit(&tx, &changes(&format!("t{}", i), 4))
                        .unwrap();
                    manager.commit(&tx).unwrap();
                }
                let writes = changes("other", 4);

                b.iter(|| manager.can_commit(&reader, black_box(&writes)).unwrap());

                manager.abort(&reader);
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_start_commit,
    bench_conflict_check_with_retained_change_sets
);
criterion_main!(benches);
