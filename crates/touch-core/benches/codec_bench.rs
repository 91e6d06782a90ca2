//! Criterion benchmarks for the line-delimited JSON codec.
//!
//! Every gesture costs one encode on the host and one decode on the device, so
//! these numbers bound the protocol overhead added to each command.
//!
//! Run with:
//! ```bash
//! cargo bench --package touch-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use touch_core::protocol::{
    decode_command, decode_response, encode_command, encode_response, Command, CommandKind,
    Response,
};
use touch_core::ScreenSize;

// ── Message fixtures ──────────────────────────────────────────────────────────

fn make_tap() -> Command {
    Command::with_id(
        "tap-7f3a",
        CommandKind::Tap {
            x: 400,
            y: 240,
            duration_ms: Some(50),
        },
    )
}

fn make_swipe() -> Command {
    Command::with_id(
        "swipe-7f3b",
        CommandKind::Swipe {
            x: 10,
            y: 400,
            x2: 10,
            y2: 40,
            duration_ms: Some(300),
            steps: None,
        },
    )
}

fn make_key_type() -> Command {
    Command::with_id(
        "key_type-7f3c",
        CommandKind::KeyType {
            text: "The quick brown fox jumps over the lazy dog".to_string(),
        },
    )
}

fn make_ready() -> Response {
    let screen = ScreenSize::new(800, 480).unwrap_or(touch_core::domain::screen::FALLBACK_SCREEN);
    Response::ready("init-1", screen, "uinput device created at /dev/uinput")
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    let tap = make_tap();
    group.bench_function("tap", |b| b.iter(|| encode_command(black_box(&tap)).unwrap()));

    let swipe = make_swipe();
    group.bench_function("swipe", |b| {
        b.iter(|| encode_command(black_box(&swipe)).unwrap())
    });

    let ready = make_ready();
    group.bench_function("ready_response", |b| {
        b.iter(|| encode_response(black_box(&ready)).unwrap())
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    let tap_line = encode_command(&make_tap()).unwrap();
    group.bench_function("tap", |b| {
        b.iter(|| decode_command(black_box(&tap_line)).unwrap())
    });

    let text_line = encode_command(&make_key_type()).unwrap();
    group.bench_function("key_type", |b| {
        b.iter(|| decode_command(black_box(&text_line)).unwrap())
    });

    // Worst case for the engine: the envelope is parsed, then rejected
    let unknown = r#"{"id":"x","type":"pinch","scale":2.0}"#;
    group.bench_function("unknown_type", |b| {
        b.iter(|| decode_command(black_box(unknown)).unwrap_err())
    });

    let ok_line = "{\"id\":\"tap-7f3a\",\"status\":\"ok\"}\n";
    group.bench_function("ok_response", |b| {
        b.iter(|| decode_response(black_box(ok_line)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
