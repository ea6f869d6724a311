//! Criterion benchmark untuk ring dan channel
//!
//! Run dengan: cargo bench

use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use logring::core::{CircularLogBuffer, LogChannel};

fn bench_put_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_buffer");
    group.throughput(Throughput::Elements(1));

    // Ring selalu penuh: setiap put memicu overwrite
    group.bench_function("put_overwrite", |b| {
        let mut rb = CircularLogBuffer::new(1024);
        let mut i = 0u8;
        b.iter(|| {
            rb.put_byte(black_box(i));
            i = i.wrapping_add(1);
        });
    });

    group.bench_function("put_get_cycle", |b| {
        let mut rb = CircularLogBuffer::new(1024);
        let mut i = 0u8;
        b.iter(|| {
            rb.put_byte(black_box(i));
            black_box(rb.get_byte());
            i = i.wrapping_add(1);
        });
    });

    group.finish();
}

fn bench_channel(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel");
    let line = b"2024-01-01T00:00:00Z INFO request handled in 42us\n";

    for size in [64usize, 1024, 16 * 1024].iter() {
        group.throughput(Throughput::Bytes(line.len() as u64));
        group.bench_function(format!("write_read_{}", size), |b| {
            let chan = LogChannel::new(*size);
            b.iter(|| {
                chan.write(black_box(line));
                black_box(chan.read(line.len(), true).ok());
            });
        });
    }

    group.bench_function("print", |b| {
        let chan = LogChannel::new(1024);
        let mut seq = 0u64;
        b.iter(|| {
            chan.print(format_args!("seq={} status={}\n", black_box(seq), "ok"));
            seq = seq.wrapping_add(1);
        });
    });

    // Producer di thread lain, consumer blocking di thread bench
    group.bench_function("blocking_handoff", |b| {
        let chan = Arc::new(LogChannel::new(4096));
        b.iter(|| {
            let producer = {
                let chan = Arc::clone(&chan);
                thread::spawn(move || {
                    chan.write(line);
                })
            };
            let mut got = 0;
            while got < line.len() {
                got += chan.read(line.len() - got, false).map(|v| v.len()).unwrap_or(0);
            }
            producer.join().ok();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_put_get, bench_channel);
criterion_main!(benches);
