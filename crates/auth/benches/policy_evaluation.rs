//! Policy evaluation benchmarks.
//!
//! Run with: `cargo bench -p hms-auth`

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use hms_auth::{PolicyEvaluator, PrincipalId, Requirement, Role, RoleCatalog};

fn bench_evaluate(c: &mut Criterion) {
    let catalog = Arc::new(RoleCatalog::hospital_defaults());
    let evaluator = PolicyEvaluator::new(catalog.clone());

    let nurse = catalog.resolve(PrincipalId::new(), [Role::NURSE]);
    let admin = catalog.resolve(PrincipalId::new(), [Role::ADMIN]);

    let role_only = Requirement::any_role([Role::DOCTOR, Role::ADMIN]);
    let nested = Requirement::any_role([Role::ADMIN])
        .or(Requirement::permission("beds.write").and(Requirement::permission("beds.read")));

    let mut group = c.benchmark_group("evaluate");

    group.bench_function("role_only_deny", |b| {
        b.iter(|| evaluator.evaluate(black_box(&nurse), black_box(&role_only)))
    });

    group.bench_function("nested_allow_via_permissions", |b| {
        b.iter(|| evaluator.evaluate(black_box(&nurse), black_box(&nested)))
    });

    group.bench_function("nested_allow_short_circuit", |b| {
        b.iter(|| evaluator.evaluate(black_box(&admin), black_box(&nested)))
    });

    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let catalog = RoleCatalog::hospital_defaults();

    c.bench_function("resolve_principal", |b| {
        b.iter(|| catalog.resolve(PrincipalId::new(), black_box([Role::NURSE, Role::DOCTOR])))
    });
}

criterion_group!(benches, bench_evaluate, bench_resolve);
criterion_main!(benches);
