use anyhow::Result;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::rc::Rc;

use hearth::plugins::trash::{format_tooltip, scan_trash, TrashContents};
use hearth::plugins::{ControlContext, ModuleId, ModuleRegistry, PanelControl, PanelModule};

fn noop(_control: &mut PanelControl, _ctx: &ControlContext<'_>) -> Result<()> {
    Ok(())
}

fn registry_of(size: usize) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    for i in 0..size {
        registry.register(PanelModule::builtin(
            ModuleId(i as i32),
            format!("module{i}"),
            format!("Module {i}"),
            Rc::new(noop),
        ));
    }
    registry
}

/// Benchmark module lookups as done once per saved control at startup
fn bench_registry_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_lookup");

    for size in &[4, 16, 64] {
        let registry = registry_of(*size);
        let last_name = format!("MODULE{}", size - 1);
        let last_id = ModuleId(*size as i32 - 1);

        group.bench_with_input(BenchmarkId::new("by_name", size), size, |b, _| {
            b.iter(|| registry.find_by_name(black_box(&last_name)).is_some());
        });

        group.bench_with_input(BenchmarkId::new("by_id", size), size, |b, _| {
            b.iter(|| registry.find_by_id(black_box(last_id)).is_some());
        });
    }

    group.finish();
}

/// Benchmark one trash poll over directories of growing size
fn bench_trash_poll(c: &mut Criterion) {
    let mut group = c.benchmark_group("trash_poll");

    for files in &[10, 100, 1000] {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..*files {
            std::fs::write(dir.path().join(format!("file{i}")), b"trash").unwrap();
        }

        group.bench_with_input(BenchmarkId::from_parameter(files), files, |b, _| {
            b.iter(|| scan_trash(black_box(dir.path())));
        });
    }

    group.bench_function("format_tooltip", |b| {
        let contents = TrashContents {
            files: 1234,
            bytes: 5 * 1024 * 1024,
        };
        b.iter(|| format_tooltip(black_box(&contents)));
    });

    group.finish();
}

criterion_group!(benches, bench_registry_lookup, bench_trash_poll);
criterion_main!(benches);
