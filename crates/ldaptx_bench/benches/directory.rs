//! Transactional directory benchmarks against the in-memory server.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ldaptx_bench::{people, person, person_dn, populated};
use ldaptx_codec::{Filter, Modification, Scope};

/// Benchmark a modify with and without a transaction around it.
fn bench_modify(c: &mut Criterion) {
    let mut group = c.benchmark_group("modify");

    group.bench_function("autocommit", |b| {
        let (_server, mut dir) = populated(1).unwrap();
        let target = person_dn(&people().unwrap(), 0);
        b.iter(|| {
            dir.modify(&target, &[Modification::replace("description", ["x"])])
                .unwrap();
        });
    });

    group.bench_function("transaction_commit", |b| {
        let (_server, mut dir) = populated(1).unwrap();
        let target = person_dn(&people().unwrap(), 0);
        b.iter(|| {
            dir.transaction(|dir| {
                dir.modify(&target, &[Modification::replace("description", ["x"])])
            })
            .unwrap();
        });
    });

    group.finish();
}

/// Benchmark rolling back batches of adds.
fn bench_rollback(c: &mut Criterion) {
    let mut group = c.benchmark_group("rollback");

    for batch_size in [10, 100].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &batch_size| {
                let (_server, mut dir) = populated(0).unwrap();
                let base = people().unwrap();

                b.iter(|| {
                    dir.begin_transaction().unwrap();
                    for i in 0..batch_size {
                        dir.add(&person_dn(&base, i), black_box(person(i))).unwrap();
                    }
                    dir.rollback().unwrap();
                });
            },
        );
    }

    group.finish();
}

/// Benchmark searches that merge the shadow cache with server results.
fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    for count in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("cold", count), count, |b, &count| {
            let (_server, mut dir) = populated(count).unwrap();
            let base = people().unwrap();
            b.iter(|| {
                let found = dir
                    .search(&base, Scope::OneLevel, &Filter::everything(), &["uid"], None)
                    .unwrap()
                    .count();
                black_box(found);
            });
        });

        group.bench_with_input(BenchmarkId::new("in_transaction", count), count, |b, &count| {
            let (_server, mut dir) = populated(count).unwrap();
            let base = people().unwrap();
            dir.begin_transaction().unwrap();
            for i in 0..count.min(50) {
                dir.modify(
                    &person_dn(&base, i),
                    &[Modification::replace("description", ["pending"])],
                )
                .unwrap();
            }
            b.iter(|| {
                let found = dir
                    .search(&base, Scope::OneLevel, &Filter::everything(), &["uid"], None)
                    .unwrap()
                    .count();
                black_box(found);
            });
            dir.rollback().unwrap();
        });
    }

    group.finish();
}

criterion_group!(benches, bench_modify, bench_rollback, bench_search);

criterion_main!(benches);
