use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use telemetry_forwarder::MetricPoint;
use telemetry_forwarder::collector::{ChannelReading, DEFAULT_SOURCE, GpsFix, build_point};
use telemetry_forwarder::encoder::LineBuilder;
use telemetry_forwarder::reliability::gzip;

fn benchmark_line_builder(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_builder");

    group.bench_function("reference_point", |b| {
        let mut builder = LineBuilder::new();
        b.iter(|| {
            builder.reset();
            builder.set_measurement("m").unwrap();
            builder.add_tag("source", "test").unwrap();
            builder.add_field_double("a", std::hint::black_box(1.5)).unwrap();
            builder.add_field_integer("b", std::hint::black_box(2)).unwrap();
            builder.set_timestamp(1_700_000_000).unwrap();
            builder.finalize().unwrap()
        });
    });

    group.bench_function("escaped_string_field", |b| {
        let mut builder = LineBuilder::new();
        b.iter(|| {
            builder.reset();
            builder.set_measurement("events").unwrap();
            builder.add_tag("site", "lab one,north").unwrap();
            builder
                .add_field_string("message", std::hint::black_box(r#"door "A" at C:\gate"#))
                .unwrap();
            builder.set_timestamp(1_700_000_000).unwrap();
            builder.finalize().unwrap()
        });
    });

    group.finish();
}

fn benchmark_sensor_cycle(c: &mut Criterion) {
    let channels: Vec<ChannelReading> = (0..16)
        .map(|i| ChannelReading::new(format!("ch_{i:02}"), 20.0 + i as f64 * 0.25))
        .collect();
    let gps = GpsFix {
        latitude: -23.55,
        longitude: -46.63,
        altitude: 760.0,
        speed: f64::NAN,
    };

    c.bench_function("sensor_cycle_16_channels", |b| {
        let mut builder = LineBuilder::new();
        b.iter(|| {
            let point = build_point(DEFAULT_SOURCE, &channels, &gps, 1_700_000_000);
            point.encode_with(&mut builder).unwrap()
        });
    });
}

fn benchmark_batch_compression(c: &mut Criterion) {
    let batch: String = (0..5000)
        .map(|i| {
            MetricPoint::new("measurements")
                .tag("source", DEFAULT_SOURCE)
                .field("pressure", 101.325 + i as f64)
                .timestamp(1_700_000_000 + i)
                .encode()
                .unwrap()
                .as_str()
                .to_string()
        })
        .collect();

    let mut group = c.benchmark_group("replay_batch");
    group.throughput(Throughput::Bytes(batch.len() as u64));
    group.sample_size(20);
    group.bench_function("gzip_5000_entries", |b| {
        b.iter(|| gzip(std::hint::black_box(batch.as_bytes())).unwrap());
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_line_builder,
    benchmark_sensor_cycle,
    benchmark_batch_compression
);
criterion_main!(benches);
