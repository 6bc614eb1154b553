use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use adaptive_knockoff::helpers::Synthetic;
use adaptive_knockoff::AdaptiveKnockoff;

fn bench_refit_cadence(c: &mut Criterion) {
    let data = Synthetic::new(500).signals(50).signal_mean(3.0).generate(1);
    let mut group = c.benchmark_group("refit_cadence");
    group.sample_size(10);
    for k in [1usize, 5, 25, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(k), &k, |b, &k| {
            let filter = AdaptiveKnockoff::new().refit_every_k_reveals(k).record_trace(false);
            b.iter(|| {
                let outcome = filter
                    .run_scalar(
                        black_box(&data.statistics),
                        black_box(&data.side_info),
                        &[0.1, 0.2],
                    )
                    .unwrap();
                black_box(outcome.result().levels[0].count)
            });
        });
    }
    group.finish();
}

fn bench_early_stop(c: &mut Criterion) {
    // Mostly null: the bound is crossed early.
    let data = Synthetic::new(2_000).signals(20).generate(2);
    let mut group = c.benchmark_group("early_stop");
    group.sample_size(10);
    for allow in [false, true] {
        group.bench_with_input(BenchmarkId::from_parameter(allow), &allow, |b, &allow| {
            let filter = AdaptiveKnockoff::fast().allow_early_stop(allow);
            b.iter(|| {
                let outcome = filter
                    .run_scalar(&data.statistics, &data.side_info, &[0.1])
                    .unwrap();
                black_box(outcome.result().revealed())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_refit_cadence, bench_early_stop);
criterion_main!(benches);
