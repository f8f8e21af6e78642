//! Criterion benchmarks for the broker frame codec and directory serializer.
//!
//! Run with:
//! ```bash
//! cargo bench --package broker-core --bench codec_bench
//! ```

use broker_core::protocol::{build_directory, decode_header, encode_frame, Command, SequenceBase};
use broker_core::ServerAdvertisement;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn make_servers(count: usize) -> Vec<ServerAdvertisement> {
    (0..count)
        .map(|i| {
            ServerAdvertisement::new(
                format!("World {i}"),
                "Free channel for all levels",
                "192.168.0.10",
                8360 + (i % 100) as u16,
                500,
            )
        })
        .collect()
}

fn bench_login_ack(c: &mut Criterion) {
    let command = Command::AuthAck.code();
    let body = [0u8, 0];
    c.bench_function("encode_login_ack", |b| {
        b.iter(|| {
            let frame = encode_frame(SequenceBase::FreshLogin, command, black_box(&body));
            black_box(frame)
        })
    });
}

fn bench_decode_header(c: &mut Criterion) {
    let frame = [0x06, 0x00, 0x00, 0x00, 0x00, 0x11];
    c.bench_function("decode_header", |b| {
        b.iter(|| decode_header(black_box(&frame)))
    });
}

fn bench_directory(c: &mut Criterion) {
    let command = Command::DirectoryResponse.code();
    let mut group = c.benchmark_group("directory_response");
    for count in [1usize, 16, 255] {
        let servers = make_servers(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &servers, |b, servers| {
            b.iter(|| {
                let body = build_directory(black_box(servers), black_box(42)).expect("directory");
                encode_frame(SequenceBase::Cumulative(0), command, &body)
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_login_ack,
    bench_decode_header,
    bench_directory
);
criterion_main!(benches);
