use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use stockcast_core::{EntityId, Period};
use stockcast_forecast::{ModelBackend, forecast_seed};
use stockcast_timeseries::{Observation, TimeSeries};

fn synthetic_series(entity_id: EntityId, len: usize) -> TimeSeries {
    let start = Period::from_ymd(2024, 1, 1).unwrap();
    let observations = (0..len)
        .map(|i| {
            // Weekly seasonality on a slow upward trend.
            let value = 100.0 + 25.0 * ((i % 7) as f64) + i as f64 * 0.3;
            Observation::new(entity_id, start.offset(i as i64), value)
        })
        .collect();
    TimeSeries::new(observations)
}

fn bench_fit_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("backend_fit_latency");
    group.sample_size(500);

    let entity_id = EntityId::new();
    let series = synthetic_series(entity_id, 365);
    let seed = forecast_seed(entity_id, 30);
    let backends = [
        ("naive", ModelBackend::Naive),
        ("seasonal_trend", ModelBackend::SeasonalTrend { seasonal_period: 7 }),
        (
            "regression_ensemble",
            ModelBackend::RegressionEnsemble { seasonal_period: 7 },
        ),
    ];

    for (name, backend) in &backends {
        group.bench_function(*name, |b| {
            b.iter(|| {
                black_box(
                    backend
                        .fit_and_forecast(black_box(&series), 30, 0.90, seed)
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

fn bench_history_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("backend_history_scaling");

    let entity_id = EntityId::new();
    let backend = ModelBackend::SeasonalTrend { seasonal_period: 7 };
    let seed = forecast_seed(entity_id, 30);

    for history_len in [30usize, 90, 365, 1825].iter() {
        let series = synthetic_series(entity_id, *history_len);
        group.throughput(Throughput::Elements(*history_len as u64));
        group.bench_with_input(
            BenchmarkId::new("seasonal_trend", history_len),
            history_len,
            |b, _| {
                b.iter(|| {
                    black_box(
                        backend
                            .fit_and_forecast(black_box(&series), 30, 0.90, seed)
                            .unwrap(),
                    )
                });
            },
        );
    }

    group.finish();
}

fn bench_horizon_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("backend_horizon_scaling");

    let entity_id = EntityId::new();
    let series = synthetic_series(entity_id, 365);
    let backend = ModelBackend::RegressionEnsemble { seasonal_period: 7 };

    for horizon in [7usize, 30, 90, 365].iter() {
        group.throughput(Throughput::Elements(*horizon as u64));
        group.bench_with_input(BenchmarkId::new("regression_ensemble", horizon), horizon, |b, &h| {
            let seed = forecast_seed(entity_id, h);
            b.iter(|| {
                black_box(
                    backend
                        .fit_and_forecast(black_box(&series), h, 0.90, seed)
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_fit_latency,
    bench_history_scaling,
    bench_horizon_scaling
);
criterion_main!(benches);
