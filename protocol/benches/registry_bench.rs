// Challenge registry benchmarks for the LEDGERBOUND protocol.
//
// Covers mint/consume round-trips, contended concurrent consumption, and
// sweep cost over a large pending set.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use ledgerbound_protocol::access::{ChallengeRegistry, RegistryConfig};
use ledgerbound_protocol::clock::{Clock, SystemClock};

fn registry() -> ChallengeRegistry {
    ChallengeRegistry::new(RegistryConfig::default(), Arc::new(SystemClock) as Arc<dyn Clock>)
}

fn bench_create(c: &mut Criterion) {
    let registry = registry();
    let mut token = 0u64;

    c.bench_function("registry/create", |b| {
        b.iter(|| {
            token += 1;
            registry.create("0xreader", token, "0xBOOK").unwrap()
        });
    });
}

fn bench_create_consume_roundtrip(c: &mut Criterion) {
    let registry = registry();

    c.bench_function("registry/create_consume", |b| {
        b.iter(|| {
            let challenge = registry.create("0xreader", 1, "0xBOOK").unwrap();
            registry.consume(&challenge.id).unwrap()
        });
    });
}

fn bench_consume_miss(c: &mut Criterion) {
    // The replay path: an id that is already spent.
    let registry = registry();

    c.bench_function("registry/consume_miss", |b| {
        b.iter(|| registry.consume("0000-spent").unwrap_err());
    });
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry/sweep");

    for pending in [1_000usize, 10_000, 50_000] {
        group.throughput(Throughput::Elements(pending as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(pending),
            &pending,
            |b, &pending| {
                b.iter_with_setup(
                    || {
                        let registry = registry();
                        for token in 0..pending as u64 {
                            registry.create("0xreader", token, "0xBOOK").unwrap();
                        }
                        registry
                    },
                    // Nothing is expired, so this is the pure scan cost.
                    |registry| registry.sweep_expired(),
                );
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_create,
    bench_create_consume_roundtrip,
    bench_consume_miss,
    bench_sweep,
);
criterion_main!(benches);
