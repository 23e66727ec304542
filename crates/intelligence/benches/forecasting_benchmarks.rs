use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chrono::NaiveDate;
use microfin_intelligence::{DemandSeries, ForecastEngine, ForecastMethod, IntelligenceConfig};
use rust_decimal::Decimal;

/// Deterministic daily demand with weekly shape and a little jitter.
fn demand(days: usize) -> DemandSeries {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let quantities: Vec<Decimal> = (0..days)
        .map(|i| {
            let weekly = [12i64, 9, 10, 11, 14, 20, 6][i % 7];
            let jitter = ((i * 37) % 5) as i64 - 2;
            Decimal::from((weekly + jitter).max(0))
        })
        .collect();
    DemandSeries::from_daily(start, &quantities).unwrap()
}

fn bench_forecast_methods(c: &mut Criterion) {
    let engine = ForecastEngine::new(IntelligenceConfig::default());
    let mut group = c.benchmark_group("forecast");

    for days in [30usize, 90, 365] {
        let series = demand(days);
        for method in ForecastMethod::ALL {
            group.bench_with_input(
                BenchmarkId::new(method.as_str(), days),
                &series,
                |b, series| {
                    b.iter(|| {
                        let _ = black_box(engine.forecast(black_box(series), method, 30));
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_forecast_methods);
criterion_main!(benches);
