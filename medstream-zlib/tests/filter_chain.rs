//! Chain-level tests: output filter into memory, input filter back out.

use medstream_core::prelude::*;
use medstream_zlib::{ZlibInputFilter, ZlibOutputFilter, compress_to_vec};

fn generate_text_like(size: usize) -> Vec<u8> {
    let words = [
        "PatientName", "StudyDate", "Modality", "SOPInstanceUID", "PixelData", "CT", "MR",
        "ORIGINAL", "PRIMARY", "AXIAL",
    ];
    let mut data = Vec::with_capacity(size);
    let mut i = 0usize;
    while data.len() < size {
        data.extend_from_slice(words[(i * 7 + i / 3) % words.len()].as_bytes());
        data.push(b'\\');
        i += 1;
    }
    data.truncate(size);
    data
}

fn generate_noise(size: usize) -> Vec<u8> {
    let mut seed: u64 = 0x2545F4914F6CDD1D;
    (0..size)
        .map(|_| {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed as u8
        })
        .collect()
}

fn deflate_through_filter(data: &[u8], config: &FilterConfig, chunk: usize) -> Vec<u8> {
    let (consumer, sink) = MemoryConsumer::unbounded();
    let mut filter = ZlibOutputFilter::with_config(config).unwrap();
    filter.append(Box::new(consumer)).unwrap();
    for piece in data.chunks(chunk.max(1)) {
        assert_eq!(filter.write(piece), piece.len());
    }
    filter.flush();
    assert!(filter.is_flushed());
    sink.take()
}

fn inflate_through_filter(compressed: Vec<u8>, config: &FilterConfig, chunk: usize) -> Vec<u8> {
    let mut filter = ZlibInputFilter::with_config(config).unwrap();
    filter
        .append(Box::new(MemoryProducer::new(compressed)))
        .unwrap();
    let mut out = Vec::new();
    let mut buf = vec![0u8; chunk];
    loop {
        let n = filter.read(&mut buf);
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    assert!(filter.good());
    assert!(filter.eos());
    out
}

#[test]
fn test_chunk_sizes() {
    let data = generate_text_like(64 * 1024);
    let config = FilterConfig::default();
    let compressed = deflate_through_filter(&data, &config, 4096);

    for chunk in [1usize, 7, 4096, data.len()] {
        let out = inflate_through_filter(compressed.clone(), &config, chunk);
        assert_eq!(out.len(), data.len(), "chunk size {}", chunk);
        assert_eq!(out, data, "chunk size {}", chunk);
    }
}

#[test]
fn test_write_chunk_sizes() {
    let data = generate_text_like(20_000);
    let config = FilterConfig::default();
    for chunk in [1usize, 7, 4096, data.len()] {
        let compressed = deflate_through_filter(&data, &config, chunk);
        assert_eq!(inflate_through_filter(compressed, &config, 4096), data);
    }
}

#[test]
fn test_incompressible_data() {
    let data = generate_noise(100_000);
    let config = FilterConfig::default();
    let compressed = deflate_through_filter(&data, &config, 3000);
    assert_eq!(inflate_through_filter(compressed, &config, 999), data);
}

#[test]
fn test_all_levels() {
    let data = generate_text_like(30_000);
    let mut sizes = Vec::new();
    for level in 0..=9u8 {
        let config = FilterConfig::default().with_level(level);
        let compressed = deflate_through_filter(&data, &config, 4096);
        sizes.push(compressed.len());
        assert_eq!(inflate_through_filter(compressed, &config, 4096), data);
    }
    // Stored blocks are larger than anything the compressor emits.
    assert!(sizes[0] > sizes[6]);
}

#[test]
fn test_small_buffers_wrap() {
    let data = generate_text_like(50_000);
    let config = FilterConfig::default().with_buffer_size(13);
    let compressed = deflate_through_filter(&data, &config, 101);
    assert_eq!(inflate_through_filter(compressed, &config, 37), data);
}

#[test]
fn test_rfc1950_input() {
    let data = generate_text_like(10_000);
    let zlib = compress_to_vec(&data, CompressionLevel::DEFAULT, true).unwrap();
    let config = FilterConfig::default().with_rfc1950(true);
    assert_eq!(inflate_through_filter(zlib, &config, 512), data);
}

#[test]
fn test_raw_expectation_rejects_zlib_header() {
    let data = generate_text_like(10_000);
    let zlib = compress_to_vec(&data, CompressionLevel::DEFAULT, true).unwrap();
    let mut filter = ZlibInputFilter::with_config(&FilterConfig::default()).unwrap();
    filter.append(Box::new(MemoryProducer::new(zlib))).unwrap();

    let mut buf = vec![0u8; data.len()];
    let mut got = 0;
    while got < buf.len() {
        let n = filter.read(&mut buf[got..]);
        if n == 0 {
            break;
        }
        got += n;
    }
    // Either the header is rejected outright or the bytes are garbage.
    assert!(!filter.good() || buf != data);
}

#[test]
fn test_incremental_upstream_suspends() {
    let data = generate_text_like(40_000);
    let compressed = compress_to_vec(&data, CompressionLevel::DEFAULT, false).unwrap();

    let (producer, feed) = MemoryProducer::channel();
    let mut filter = ZlibInputFilter::with_config(&FilterConfig::default()).unwrap();
    filter.append(Box::new(producer)).unwrap();

    let mut out = Vec::new();
    let mut buf = vec![0u8; 1500];
    for fragment in compressed.chunks(100) {
        feed.push(fragment).unwrap();
        loop {
            let n = filter.read(&mut buf);
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert!(filter.good());
    }
    feed.close();
    loop {
        let n = filter.read(&mut buf);
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }

    assert_eq!(out, data);
    assert!(filter.good());
    assert!(filter.eos());
}

#[test]
fn test_trickling_upstream() {
    let data = generate_text_like(8_000);
    let compressed = compress_to_vec(&data, CompressionLevel::BEST, false).unwrap();
    let upstream = MemoryProducer::new(compressed).with_max_read(1);

    let mut filter = ZlibInputFilter::with_config(&FilterConfig::default()).unwrap();
    filter.append(Box::new(upstream)).unwrap();

    let mut out = Vec::new();
    let mut buf = [0u8; 64];
    let mut idle = 0;
    while !filter.eos() {
        let n = filter.read(&mut buf);
        out.extend_from_slice(&buf[..n]);
        if n == 0 {
            idle += 1;
            assert!(idle < 1_000_000, "filter stopped making progress");
        }
        assert!(filter.good());
    }
    assert_eq!(out, data);
}

#[test]
fn test_putback_window_across_refills() {
    let data = generate_noise(20_000);
    let config = FilterConfig::default();
    let compressed = deflate_through_filter(&data, &config, 4096);

    let mut filter = ZlibInputFilter::with_config(&config).unwrap();
    filter.append(Box::new(MemoryProducer::new(compressed))).unwrap();

    let mut position = 0usize;
    let mut buf = vec![0u8; 5000];
    while position < 15_000 {
        let n = filter.read(&mut buf);
        assert!(n > 0);
        position += n;
    }

    filter.putback(1024);
    assert!(filter.good());
    let mut again = vec![0u8; 1024];
    assert_eq!(filter.read(&mut again), 1024);
    assert_eq!(&again[..], &data[position - 1024..position]);
}
