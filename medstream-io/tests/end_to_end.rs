//! End-to-end: deflate 1 MiB to disk, then read it back piecewise through a
//! read cache.

use medstream_core::{FilterConfig, StreamCompression};
use medstream_io::{
    ByteOrder, InputStream, OutputStream, ReadCache, StreamedValue, ValueSource,
};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

const SIZE: usize = 1024 * 1024;

fn write_deflated(path: &std::path::Path, data: &[u8], config: FilterConfig) {
    let mut out = OutputStream::create_with_config(path, config).unwrap();
    out.install_compression_filter(StreamCompression::Zlib)
        .unwrap();

    let mut written = 0;
    while written < data.len() {
        let end = (written + 10_000).min(data.len());
        let n = out.write(&data[written..end]).unwrap();
        assert!(n > 0, "file-backed stream must not suspend");
        written += n;
    }
    out.flush().unwrap();
    assert!(out.is_flushed());
    assert_eq!(out.tell(), data.len() as u64);
}

#[test]
fn test_random_partial_reads_through_read_cache() {
    let mut rng = StdRng::seed_from_u64(0x5EED_D1C0);
    let mut data = vec![0u8; SIZE];
    rng.fill_bytes(&mut data);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("value.deflated");
    let config = FilterConfig::default().with_level(6u8);
    write_deflated(&path, &data, config);

    let mut stream = InputStream::open_with_config(&path, 0, config).unwrap();
    stream
        .install_compression_filter(StreamCompression::Zlib)
        .unwrap();
    let value = StreamedValue::new(
        stream.new_factory().unwrap(),
        SIZE as u64,
        ByteOrder::Little,
        1,
    );
    drop(stream);

    let mut cache = ReadCache::new();
    for _ in 0..1000 {
        let len = rng.gen_range(1..=20usize);
        let offset = rng.gen_range(0..=(SIZE - len));
        let mut buf = vec![0u8; len];
        value
            .read_partial(&mut buf, offset as u64, &mut cache, ByteOrder::Little)
            .unwrap();
        assert_eq!(&buf[..], &data[offset..offset + len], "offset {}", offset);
    }
    assert!(cache.is_owner(value.owner()));
}

#[test]
fn test_sequential_partial_reads_reuse_stream() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut data = vec![0u8; 200_000];
    rng.fill_bytes(&mut data);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sequential.deflated");
    write_deflated(&path, &data, FilterConfig::default());

    let mut stream = InputStream::open(&path, 0).unwrap();
    stream
        .install_compression_filter(StreamCompression::Zlib)
        .unwrap();
    let value = StreamedValue::new(
        stream.new_factory().unwrap(),
        data.len() as u64,
        ByteOrder::Little,
        1,
    );

    let mut cache = ReadCache::new();
    let mut offset = 0usize;
    while offset < data.len() {
        let len = (data.len() - offset).min(4096);
        let mut buf = vec![0u8; len];
        value
            .read_partial(&mut buf, offset as u64, &mut cache, ByteOrder::Little)
            .unwrap();
        assert_eq!(&buf[..], &data[offset..offset + len]);
        // Forward-only access keeps the one cached stream positioned.
        assert_eq!(cache.position(), Some((offset + len) as u64));
        offset += len;
    }
}

#[test]
fn test_value_after_plain_header() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut body = vec![0u8; 50_000];
    rng.fill_bytes(&mut body);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("with_header.bin");
    {
        let mut out = OutputStream::create(&path).unwrap();
        out.write(&[0u8; 128]).unwrap();
        out.write(b"DICM").unwrap();
        out.install_compression_filter(StreamCompression::Zlib)
            .unwrap();
        out.write(b"leading element").unwrap();
        assert_eq!(out.write(&body).unwrap(), body.len());
        out.flush().unwrap();
    }

    let mut stream = InputStream::open(&path, 128).unwrap();
    let mut magic = [0u8; 4];
    stream.read_fully(&mut magic).unwrap();
    assert_eq!(&magic, b"DICM");
    stream
        .install_compression_filter(StreamCompression::Zlib)
        .unwrap();
    stream.skip_fully(15).unwrap();

    let value = StreamedValue::new(
        stream.new_factory().unwrap(),
        body.len() as u64,
        ByteOrder::Little,
        1,
    );
    let mut cache = ReadCache::new();
    let mut buf = [0u8; 16];
    value
        .read_partial(&mut buf, 40_000, &mut cache, ByteOrder::Little)
        .unwrap();
    assert_eq!(&buf[..], &body[40_000..40_016]);
    value
        .read_partial(&mut buf, 0, &mut cache, ByteOrder::Little)
        .unwrap();
    assert_eq!(&buf[..], &body[..16]);
}
