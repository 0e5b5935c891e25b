// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_fiber::adapters::memory::{HostNodeId, MemoryHost};
use understory_fiber::{Element, Engine, StepBudget, Unbounded, WorkStatus};

/// A `ul` of `n` rows, each a `li` with a label property and a text child.
fn gen_list(n: usize, label: &str) -> Element {
    Element::builder("ul")
        .children((0..n).map(|i| {
            Element::builder("li")
                .prop("label", format!("{label}{i}"))
                .prop("index", i as i64)
                .text(format!("row {i}"))
                .build()
                .unwrap()
        }))
        .build()
        .unwrap()
}

fn mounted(element: &Element) -> (Engine<MemoryHost>, HostNodeId) {
    let mut host = MemoryHost::new();
    let container = host.create_container();
    let mut engine = Engine::new(host);
    engine.schedule_render(element.clone(), container);
    engine.run_work_unit(&Unbounded).unwrap();
    engine.commit().unwrap();
    engine.host_mut().clear_ops();
    (engine, container)
}

fn bench_first_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_render");
    for &n in &[100usize, 1_000, 10_000] {
        let tree = gen_list(n, "item");
        group.throughput(Throughput::Elements(tree.subtree_len() as u64));
        group.bench_function(format!("unbounded_n{}", n), |b| {
            b.iter_batched(
                || {
                    let mut host = MemoryHost::new();
                    let container = host.create_container();
                    (Engine::new(host), container)
                },
                |(mut engine, container)| {
                    engine.schedule_render(tree.clone(), container);
                    engine.run_work_unit(&Unbounded).unwrap();
                    black_box(engine.commit().unwrap());
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_rerender(c: &mut Criterion) {
    let mut group = c.benchmark_group("rerender");
    for &n in &[100usize, 1_000, 10_000] {
        let base = gen_list(n, "item");
        let same = gen_list(n, "item");
        let changed = gen_list(n, "row");
        group.throughput(Throughput::Elements(base.subtree_len() as u64));

        group.bench_function(format!("identical_n{}", n), |b| {
            b.iter_batched(
                || mounted(&base),
                |(mut engine, container)| {
                    engine.schedule_render(same.clone(), container);
                    engine.run_work_unit(&Unbounded).unwrap();
                    black_box(engine.commit().unwrap());
                },
                BatchSize::LargeInput,
            )
        });

        group.bench_function(format!("all_labels_changed_n{}", n), |b| {
            b.iter_batched(
                || mounted(&base),
                |(mut engine, container)| {
                    engine.schedule_render(changed.clone(), container);
                    engine.run_work_unit(&Unbounded).unwrap();
                    black_box(engine.commit().unwrap());
                },
                BatchSize::LargeInput,
            )
        });

        group.bench_function(format!("shrink_by_half_n{}", n), |b| {
            let half = gen_list(n / 2, "item");
            b.iter_batched(
                || mounted(&base),
                |(mut engine, container)| {
                    engine.schedule_render(half.clone(), container);
                    engine.run_work_unit(&Unbounded).unwrap();
                    black_box(engine.commit().unwrap());
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn bench_sliced(c: &mut Criterion) {
    let mut group = c.benchmark_group("sliced");
    let tree = gen_list(1_000, "item");
    group.throughput(Throughput::Elements(tree.subtree_len() as u64));
    for &step in &[1usize, 16, 256] {
        group.bench_function(format!("on_idle_step{}", step), |b| {
            b.iter_batched(
                || {
                    let mut host = MemoryHost::new();
                    let container = host.create_container();
                    (Engine::new(host), container)
                },
                |(mut engine, container)| {
                    engine.schedule_render(tree.clone(), container);
                    let mut slots = 0_usize;
                    while engine.on_idle(&StepBudget::new(step)).unwrap() != WorkStatus::Idle {
                        slots += 1;
                    }
                    black_box(slots);
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_first_render, bench_rerender, bench_sliced);
criterion_main!(benches);
