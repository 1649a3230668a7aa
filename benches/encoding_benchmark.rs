//! Encoding and key-building benchmarks

use chrono::{FixedOffset, TimeZone};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use upyun_relay::config::UploadConfig;
use upyun_relay::date::format_instant;
use upyun_relay::encoding::{base64_encode, basic_auth};
use upyun_relay::upload::forwarder::UploadForwarder;
use upyun_relay::upyun::{UpyunClient, UpyunClientConfig};

fn benchmark_base64(c: &mut Criterion) {
    let mut group = c.benchmark_group("base64_encode");

    for size in [16, 256, 4 * 1024].iter() {
        let input = "\u{00e9}a".repeat(size / 2);
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(format!("{}_chars", size), &input, |b, input| {
            b.iter(|| base64_encode(black_box(input)));
        });
    }

    group.bench_function("basic_auth", |b| {
        b.iter(|| basic_auth(black_box("operator"), black_box("password")));
    });

    group.finish();
}

fn benchmark_date_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("date_format");
    let instant = FixedOffset::east_opt(8 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 1, 5, 9, 8, 7)
        .unwrap();

    for pattern in ["YYYY/MM/DD", "YYYY-MM-DD HH:mm:ss.SSS", "MMMM D, YYYY h:mm a"].iter() {
        group.bench_with_input(*pattern, pattern, |b, pattern| {
            b.iter(|| format_instant(black_box(pattern), &instant));
        });
    }

    group.finish();
}

fn benchmark_object_key(c: &mut Criterion) {
    let client = UpyunClient::new(UpyunClientConfig {
        endpoint: "http://127.0.0.1:1".into(),
        bucket: "bench".into(),
        operator: "operator".into(),
        password: "password".into(),
        timeout: None,
    })
    .unwrap();
    let forwarder = UploadForwarder::new(
        Arc::new(client),
        "https://cdn.example.com",
        &UploadConfig::default(),
    );

    c.bench_function("object_key_default_folder", |b| {
        b.iter(|| forwarder.object_key(black_box("photo.png"), None));
    });
}

criterion_group!(
    benches,
    benchmark_base64,
    benchmark_date_format,
    benchmark_object_key
);
criterion_main!(benches);
