use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use kintree_bench::util::synthetic_family;
use kintree_graph::{
    DepthTable, FamilyGraph, ForceLayouter, ForceSettings, ForceSimulation, HierarchicalLayouter,
    Layouter, Viewport,
};

fn bench_hierarchical(c: &mut Criterion) {
    let graph = FamilyGraph::build(&synthetic_family(1_000, 10));
    let depths = DepthTable::compute(&graph);
    let layouter = HierarchicalLayouter::default();

    c.bench_function("hierarchical_layout_1000", |b| {
        b.iter(|| {
            let output = layouter.execute(black_box(&graph), &depths, Viewport::new(1920.0, 1080.0));
            let _ = black_box(output);
        })
    });
}

fn bench_force(c: &mut Criterion) {
    let mut group = c.benchmark_group("force_layout");
    group.sample_size(10);
    for size in [50usize, 200] {
        let graph = FamilyGraph::build(&synthetic_family(size, 5));
        let depths = DepthTable::compute(&graph);
        group.bench_with_input(BenchmarkId::new("settle", size), &graph, |b, graph| {
            b.iter(|| {
                let output =
                    ForceLayouter::default().execute(graph, &depths, Viewport::new(1280.0, 800.0));
                let _ = black_box(output);
            })
        });
    }
    group.finish();
}

fn bench_force_tick(c: &mut Criterion) {
    let graph = FamilyGraph::build(&synthetic_family(500, 10));
    let mut simulation =
        ForceSimulation::new(&graph, ForceSettings::default(), Viewport::new(1280.0, 800.0));

    c.bench_function("force_tick_500", |b| {
        b.iter(|| {
            let _ = black_box(simulation.tick());
        })
    });
}

criterion_group!(benches, bench_hierarchical, bench_force, bench_force_tick);
criterion_main!(benches);
