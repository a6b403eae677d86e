//! Benchmarks for step context lookup and tagged state access.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flowstate::prelude::*;
use std::sync::Arc;

fn step_context_benchmark(c: &mut Criterion) {
    let ctx = ExecutionContext::with_store(Arc::new(InMemoryStateStore::new())).build();
    for n in 0..32 {
        ctx.get_step_context(&format!("step-{n}"));
    }

    c.bench_function("get_step_context_cached", |b| {
        b.iter(|| black_box(ctx.get_step_context(black_box("step-17"))));
    });
}

fn state_benchmark(c: &mut Criterion) {
    let ctx = ExecutionContext::with_store(Arc::new(InMemoryStateStore::new())).build();
    let step = ctx.get_step_context("count");
    let key = StateKey::from("user-1");
    let total = StateTag::<i64>::int64("total");
    let events = StateTag::utf8("events");

    c.bench_function("store_then_lookup", |b| {
        b.iter(|| {
            step.store(&key, &total, black_box(&42)).ok();
            black_box(step.lookup(&key, &total).ok())
        });
    });

    c.bench_function("append_then_read_list", |b| {
        b.iter(|| {
            step.write_to_tag_list(&key, &events, &"click".to_string()).ok();
            let read = black_box(step.read_tag_list(&key, &events).ok());
            step.delete_tag_list(&key, &events).ok();
            read
        });
    });
}

criterion_group!(benches, step_context_benchmark, state_benchmark);
criterion_main!(benches);
