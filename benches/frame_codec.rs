//! Frame codec benchmark suite.
//!
//! Benchmarks encode and decode of representative frames:
//! - Telemetry MESSAGE with a small JSON body
//! - Video MESSAGE with a large body
//! - CONNECT with a full header set
//!
//! Run with: cargo bench --bench frame_codec
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use dronecommand_telemetry::{Command, Frame, decode, encode};

// ============================================================================
// Fixtures
// ============================================================================

fn telemetry_message() -> Frame {
    Frame::new(Command::Message)
        .header("subscription", "sub-0")
        .header("message-id", "T_sub-0@@session-abc@@1")
        .header("destination", "/exchange/drone.gui/gui.D-01.telemetry")
        .header("content-type", "application/json")
        .body(r#"{"battery":87,"altitude":120.5,"speed":14.2,"lat":41.0082,"lon":28.9784,"heading":271}"#)
}

fn video_message() -> Frame {
    let frame = "A".repeat(64 * 1024);
    Frame::new(Command::Message)
        .header("subscription", "sub-1")
        .header("destination", "/exchange/drone.gui/gui.D-01.video")
        .body(format!(r#"{{"frame":"{frame}","fps":15}}"#))
}

fn connect_frame() -> Frame {
    Frame::new(Command::Connect)
        .header("accept-version", "1.2,1.1,1.0")
        .header("host", "/")
        .header("login", "guest")
        .header("passcode", "guest")
        .header("heart-beat", "10000,10000")
}

fn fixtures() -> Vec<(&'static str, Frame)> {
    vec![
        ("telemetry", telemetry_message()),
        ("video", video_message()),
        ("connect", connect_frame()),
    ]
}

// ============================================================================
// Benchmark: Encode
// ============================================================================

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for (name, frame) in fixtures() {
        group.throughput(Throughput::Bytes(frame.encode().len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &frame, |b, frame| {
            b.iter(|| {
                let headers = frame.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()));
                black_box(encode(&frame.command, headers, &frame.body))
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Decode
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for (name, frame) in fixtures() {
        let text = frame.encode();
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &text, |b, text| {
            b.iter(|| black_box(decode(black_box(text))));
        });
    }

    group.bench_function("heartbeat", |b| b.iter(|| black_box(decode(black_box("\n")))));

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
