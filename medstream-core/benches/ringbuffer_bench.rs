//! Throughput benchmarks for the ring buffer.
//!
//! Measures push/pop cycles at different chunk sizes, with and without a
//! putback history, to show the cost of the two-run copy pattern.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use medstream_core::RingBuffer;
use std::hint::black_box;

const TOTAL: usize = 1024 * 1024;

fn pattern(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut seed: u64 = 0x123456789ABCDEF0;
    for _ in 0..size {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        data.push((seed >> 32) as u8);
    }
    data
}

fn bench_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_push_pop");
    group.throughput(Throughput::Bytes(TOTAL as u64));

    for chunk in [7usize, 512, 4096] {
        for history in [0usize, 1024] {
            let input = pattern(chunk);
            let id = BenchmarkId::new(format!("history_{history}"), chunk);
            group.bench_with_input(id, &input, |b, input| {
                let mut ring = RingBuffer::with_history(4096 + history, history);
                let mut out = vec![0u8; chunk];
                b.iter(|| {
                    let mut moved = 0;
                    while moved < TOTAL {
                        ring.push(black_box(input));
                        moved += ring.pop(&mut out);
                    }
                    black_box(&out);
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_push_pop);
criterion_main!(benches);
