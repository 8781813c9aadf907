//! # Upgradeable Runtime Benchmarks
//!
//! | Area | Measured |
//! |------|----------|
//! | Storage facade | typed set/get, transaction commit and rollback |
//! | Dispatch pipeline | full `invoke` (guard, access, module call) |
//! | Module registry | schema compatibility check on upgrade |
//! | Commit-reveal | seal and output derivation |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use shared_types::{Hash, Principal, U256};
use std::time::Duration;
use ur_01_storage_facade::{Namespace, SlotValue, StorageError, StorageFacade, TypeTag};
use ur_05_commit_reveal::{derive_output, seal};
use ur_06_module_registry::StorageSchema;
use ur_tests::fixtures::{amount, harness, DEPOSIT};

// ============================================================================
// STORAGE FACADE
// ============================================================================

fn bench_storage(c: &mut Criterion) {
    let mut group = c.benchmark_group("storage-facade");
    let ns = Namespace::new("app");

    group.bench_function("set_typed_uint", |b| {
        let mut storage = StorageFacade::in_memory();
        let mut i = 0u64;
        b.iter(|| {
            i = i.wrapping_add(1);
            storage
                .set_typed(&ns, &(i % 1024).to_be_bytes(), &SlotValue::UInt(U256::from(i)))
                .unwrap();
        })
    });

    let mut populated = StorageFacade::in_memory();
    for i in 0..1024u64 {
        populated
            .set_typed(&ns, &i.to_be_bytes(), &SlotValue::UInt(U256::from(i)))
            .unwrap();
    }
    group.bench_function("get_typed_uint", |b| {
        let mut rng = rand::thread_rng();
        b.iter(|| {
            let key: u64 = rng.gen_range(0..1024);
            black_box(populated.get_typed(&ns, &key.to_be_bytes()).unwrap())
        })
    });

    for size in [1usize, 16, 128] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("transaction_commit", size), &size, |b, &size| {
            let mut storage = StorageFacade::in_memory();
            b.iter(|| {
                storage
                    .atomically(|s| -> Result<(), StorageError> {
                        for i in 0..size as u64 {
                            s.set_typed(&ns, &i.to_be_bytes(), &SlotValue::UInt(U256::from(i)))?;
                        }
                        Ok(())
                    })
                    .unwrap();
            })
        });
        group.bench_with_input(BenchmarkId::new("transaction_rollback", size), &size, |b, &size| {
            let mut storage = StorageFacade::in_memory();
            b.iter(|| {
                let result: Result<(), StorageError> = storage.atomically(|s| {
                    for i in 0..size as u64 {
                        s.set_typed(&ns, &i.to_be_bytes(), &SlotValue::UInt(U256::from(i)))?;
                    }
                    Err(StorageError::Backend("abort".into()))
                });
                black_box(result.is_err())
            })
        });
    }

    group.finish();
}

// ============================================================================
// DISPATCH PIPELINE
// ============================================================================

fn bench_invoke(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.measurement_time(Duration::from_secs(10));

    let h = harness();
    let payload = amount(1);
    group.throughput(Throughput::Elements(1));
    group.bench_function("invoke_deposit", |b| {
        b.iter(|| black_box(h.runtime.invoke(h.user, DEPOSIT, payload.clone()).unwrap()))
    });

    let outsider = Principal::from_label("outsider");
    h.runtime.halt(h.owner).unwrap();
    group.bench_function("invoke_rejected_halted", |b| {
        b.iter(|| black_box(h.runtime.invoke(outsider, DEPOSIT, payload.clone()).is_err()))
    });

    group.finish();
}

// ============================================================================
// MODULE REGISTRY
// ============================================================================

fn bench_schema_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("module-registry");

    for fields in [4usize, 64, 512] {
        let active = (0..fields).fold(StorageSchema::new(), |schema, i| {
            schema.with(format!("field_{i}"), TypeTag::UInt)
        });
        let next = active.clone().with("extra", TypeTag::Address);
        group.throughput(Throughput::Elements(fields as u64));
        group.bench_with_input(BenchmarkId::new("check_replaces", fields), &fields, |b, _| {
            b.iter(|| black_box(next.check_replaces(&active).is_ok()))
        });
        group.bench_with_input(BenchmarkId::new("schema_hash", fields), &fields, |b, _| {
            b.iter(|| black_box(next.hash()))
        });
    }

    group.finish();
}

// ============================================================================
// COMMIT-REVEAL
// ============================================================================

fn bench_commit_reveal(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit-reveal");
    let mut rng = rand::thread_rng();
    let preimage: [u8; 32] = rng.gen();
    let salt: [u8; 32] = rng.gen();
    let entropy = Hash::new(rng.gen());

    group.bench_function("seal", |b| b.iter(|| black_box(seal(&preimage, &salt))));
    group.bench_function("derive_output", |b| {
        b.iter(|| black_box(derive_output(&preimage, &entropy)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_storage,
    bench_invoke,
    bench_schema_check,
    bench_commit_reveal
);
criterion_main!(benches);
