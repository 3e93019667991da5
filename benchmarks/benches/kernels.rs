// Benchmark for every kernel variant
// Run with: cargo bench --bench kernels

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kernbench_benchmarks::suite::random_matrix;
use kernbench_core::stencil::{diffusion, initial_condition, timeloop, Boundary};
use kernbench_core::{
    distance_matrix, estimate_pi, julia_set, Discretization, JuliaParams, Metric,
    ParallelConfig, RangeBuffer, RectangleSet, SolverOptions, Variant, WorkPool,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const SEED: u64 = 2024;

fn pool() -> WorkPool {
    WorkPool::new(&ParallelConfig::default()).expect("failed to build work pool")
}

fn bench_pi(c: &mut Criterion) {
    let pool = pool();
    let mut group = c.benchmark_group("pi");
    for samples in [100_000usize, 1_000_000] {
        group.throughput(Throughput::Elements(samples as u64));
        for variant in Variant::ALL {
            group.bench_with_input(
                BenchmarkId::new(variant.name(), samples),
                &samples,
                |b, &samples| {
                    b.iter(|| estimate_pi(black_box(samples), SEED, variant, Some(&pool)))
                },
            );
        }
    }
    group.finish();
}

fn bench_julia(c: &mut Criterion) {
    let pool = pool();
    let params = JuliaParams::small();
    let mut group = c.benchmark_group("julia");
    group.throughput(Throughput::Elements((params.width * params.height) as u64));
    for variant in Variant::ALL {
        group.bench_function(variant.name(), |b| {
            b.iter(|| julia_set(black_box(&params), variant, Some(&pool)))
        });
    }
    group.finish();
}

fn bench_distance(c: &mut Criterion) {
    let pool = pool();
    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let x = random_matrix(200, 50, 10.0, &mut rng);
    let y = random_matrix(200, 50, 10.0, &mut rng);

    for metric in Metric::ALL {
        let mut group = c.benchmark_group(format!("distance/{}", metric));
        for variant in Variant::ALL {
            group.bench_function(variant.name(), |b| {
                b.iter(|| distance_matrix(black_box(&x), black_box(&y), metric, variant, Some(&pool)))
            });
        }
        group.finish();
    }
}

fn bench_shapes(c: &mut Criterion) {
    let pool = pool();
    let rects = RectangleSet::random(100_000, SEED);
    let buffer = RangeBuffer::new(0, 100_000).expect("valid range");

    let mut group = c.benchmark_group("shapes");
    group.bench_function("rectangles/compiled", |b| {
        b.iter(|| black_box(&rects).total_area())
    });
    group.bench_function("rectangles/parallel", |b| {
        b.iter(|| black_box(&rects).total_area_parallel(&pool))
    });
    group.bench_function("range/checked", |b| {
        b.iter(|| {
            (0..buffer.len())
                .filter_map(|i| buffer.get(i))
                .map(i128::from)
                .sum::<i128>()
        })
    });
    group.bench_function("range/slice", |b| b.iter(|| black_box(&buffer).sum()));
    group.finish();
}

fn bench_stencil(c: &mut Criterion) {
    let pool = pool();
    let mut group = c.benchmark_group("stencil");

    for n in [32usize, 64] {
        let disc = Discretization::new(n, n, 10, 0.005).expect("valid grid");
        let boundary = Boundary::dirichlet_zero(&disc);
        let u = initial_condition(&disc);
        let mut out = vec![0.0; disc.n()];

        for variant in [Variant::Baseline, Variant::Compiled, Variant::Parallel] {
            group.bench_with_input(
                BenchmarkId::new(format!("diffusion/{}", variant), n),
                &n,
                |b, _| {
                    b.iter(|| {
                        diffusion(&u, &u, &boundary, &disc, &mut out, variant, Some(&pool))
                    })
                },
            );
        }
    }

    let disc = Discretization::new(32, 32, 10, 0.005).expect("valid grid");
    let boundary = Boundary::dirichlet_zero(&disc);
    let options = SolverOptions::default();
    group.sample_size(10);
    for variant in [Variant::Compiled, Variant::Parallel] {
        group.bench_function(format!("timeloop/{}", variant), |b| {
            b.iter(|| {
                let mut u = initial_condition(&disc);
                timeloop(&mut u, &boundary, &disc, &options, variant, Some(&pool))
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_pi,
    bench_julia,
    bench_distance,
    bench_shapes,
    bench_stencil
);
criterion_main!(benches);
