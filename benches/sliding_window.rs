use criterion::{criterion_group, criterion_main, Criterion};
use role_server::metrics::sliding_window::SlidingWindow;
use std::hint::black_box;
use std::time::Duration;

fn bench_sliding_window(c: &mut Criterion) {
    c.bench_function("sliding_window_record", |b| {
        let window = SlidingWindow::new(Duration::from_secs(60), 12);
        b.iter(|| {
            for sample in 0..512u64 {
                let latency = Duration::from_micros(500 + (sample % 250));
                window.record(latency, sample % 37 != 0);
            }
        });
    });

    c.bench_function("sliding_window_stats", |b| {
        let window = SlidingWindow::new(Duration::from_secs(60), 12);
        for sample in 0..5000u64 {
            let latency = Duration::from_micros(300 + (sample % 200));
            window.record(latency, sample % 41 != 0);
        }

        b.iter(|| {
            black_box(window.stats());
        });
    });
}

criterion_group!(sliding_window, bench_sliding_window);
criterion_main!(sliding_window);
