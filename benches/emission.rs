//! Benchmarks for run planning and particle synthesis.
//!
//! Run with: `cargo bench --bench emission`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;

use texel_particles::{
    CpuSubstrate, DoubleBuffer, EmissionAllocator, EmissionParams, EmissionRequest, GridLayout,
    PublishMode, RunPlan,
};

fn bench_run_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_plan");
    let layout = GridLayout::new(1024 * 1024).unwrap();

    for count in [1u32, 800, 1000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            // Start mid-row so every plan splits at least once
            b.iter(|| black_box(RunPlan::new(&layout, 1000, count).count()))
        });
    }

    group.finish();
}

fn bench_emit(c: &mut Criterion) {
    let mut group = c.benchmark_group("emit_cpu");
    let layout = GridLayout::new(1024 * 1024).unwrap();
    let mut substrate = CpuSubstrate::new();
    let mut store = DoubleBuffer::new(&mut substrate, &layout, PublishMode::CopyBack);
    let mut allocator = EmissionAllocator::new(layout, EmissionParams::default(), 7);

    for count in [200u32, 800, 1000] {
        let request = EmissionRequest::new(count, Vec3::new(0.1, -0.2, 0.0), Vec3::Y);
        group.bench_with_input(BenchmarkId::from_parameter(count), &request, |b, request| {
            b.iter(|| allocator.emit(&mut substrate, store.current_mut(), black_box(request)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_run_plan, bench_emit);
criterion_main!(benches);
