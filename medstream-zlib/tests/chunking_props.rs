//! Property tests for the filter chain.
//!
//! Data is deflated through [`ZlibOutputFilter`] with random write chunks
//! into a bounded sink, then inflated through [`ZlibInputFilter`] fed by a
//! channel in random pieces and read back with random read chunks. The
//! partitioning must never change the bytes that come out.

use medstream_core::prelude::*;
use medstream_zlib::{ZlibInputFilter, ZlibOutputFilter};
use proptest::prelude::*;

fn data_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..20_000),
        (prop::collection::vec(any::<u8>(), 1..16), 0usize..40_000)
            .prop_map(|(unit, len)| unit.iter().copied().cycle().take(len).collect()),
    ]
}

fn chunks_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..5000, 1..16)
}

fn deflate(data: &[u8], config: &FilterConfig, writes: &[usize], capacity: usize) -> Vec<u8> {
    let (consumer, sink) = MemoryConsumer::bounded(capacity);
    let mut filter = ZlibOutputFilter::with_config(config).unwrap();
    filter.append(Box::new(consumer)).unwrap();

    let mut compressed = Vec::new();
    let mut written = 0;
    let mut sizes = writes.iter().cycle();
    while written < data.len() {
        let end = (written + sizes.next().copied().unwrap_or(1)).min(data.len());
        let mut offset = written;
        while offset < end {
            offset += filter.write(&data[offset..end]);
            assert!(filter.good());
            compressed.extend(sink.take());
        }
        written = end;
    }
    while !filter.is_flushed() {
        filter.flush();
        assert!(filter.good());
        compressed.extend(sink.take());
    }
    compressed
}

fn inflate(compressed: &[u8], config: &FilterConfig, feeds: &[usize], reads: &[usize]) -> Vec<u8> {
    let (producer, feed) = MemoryProducer::channel();
    let mut filter = ZlibInputFilter::with_config(config).unwrap();
    filter.append(Box::new(producer)).unwrap();

    let mut out = Vec::new();
    let mut read_sizes = reads.iter().cycle();
    let mut drain = |filter: &mut ZlibInputFilter, out: &mut Vec<u8>| loop {
        let mut buf = vec![0u8; read_sizes.next().copied().unwrap_or(1)];
        let n = filter.read(&mut buf);
        assert!(filter.good());
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    };

    let mut fed = 0;
    let mut feed_sizes = feeds.iter().cycle();
    while fed < compressed.len() {
        let end = (fed + feed_sizes.next().copied().unwrap_or(1)).min(compressed.len());
        feed.push(&compressed[fed..end]).unwrap();
        fed = end;
        drain(&mut filter, &mut out);
    }
    feed.close();
    drain(&mut filter, &mut out);
    assert!(filter.eos());
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn roundtrip_under_any_partitioning(
        data in data_strategy(),
        level in 0u8..=9,
        buffer_size in 7usize..2048,
        writes in chunks_strategy(),
        capacity in 1usize..4096,
        feeds in chunks_strategy(),
        reads in chunks_strategy(),
    ) {
        let config = FilterConfig::default()
            .with_level(level)
            .with_buffer_size(buffer_size);

        let compressed = deflate(&data, &config, &writes, capacity);
        let restored = inflate(&compressed, &config, &feeds, &reads);
        prop_assert_eq!(restored, data);
    }
}
