//! Stream factories.
//!
//! A factory remembers where a value starts so that the value can be read
//! again later, after the stream that parsed it has moved on or been
//! dropped. For a compressed stream the factory remembers where the
//! compressed bytes begin and how many plain bytes precede the value;
//! reopening re-installs the filter and skips forward.

use crate::stream::InputStream;
use crate::temp::TempFileHandler;
use medstream_core::config::FilterConfig;
use medstream_core::error::Result;
use medstream_core::traits::StreamCompression;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

/// Creates input streams positioned at a fixed point of some source.
pub trait InputStreamFactory: fmt::Debug {
    /// Open a fresh stream at the remembered position.
    fn create(&self) -> Result<InputStream>;
}

/// Position inside a source, possibly behind a compression filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReopenPoint {
    /// Raw offset into the source.
    offset: u64,
    compression: StreamCompression,
    /// Plain bytes to skip after installing the filter.
    plain_offset: u64,
    config: FilterConfig,
}

impl ReopenPoint {
    fn new(offset: u64) -> Self {
        Self {
            offset,
            compression: StreamCompression::None,
            plain_offset: 0,
            config: FilterConfig::global(),
        }
    }

    fn apply(&self, mut stream: InputStream) -> Result<InputStream> {
        if self.compression != StreamCompression::None {
            stream.install_compression_filter(self.compression)?;
        }
        stream.skip_fully(self.plain_offset)?;
        Ok(stream)
    }
}

/// Reopens a file at a fixed offset.
#[derive(Debug, Clone)]
pub struct FileStreamFactory {
    path: PathBuf,
    point: ReopenPoint,
}

impl FileStreamFactory {
    /// Factory for the plain bytes of `path` starting at `offset`.
    pub fn new(path: impl Into<PathBuf>, offset: u64) -> Self {
        Self {
            path: path.into(),
            point: ReopenPoint::new(offset),
        }
    }

    /// Use `config` for streams and filters created by this factory.
    pub fn with_config(mut self, config: FilterConfig) -> Self {
        self.point.config = config;
        self
    }

    /// The bytes at the offset are compressed with `compression`; the value
    /// starts `plain_offset` decompressed bytes in.
    pub fn with_compression(mut self, compression: StreamCompression, plain_offset: u64) -> Self {
        self.point.compression = compression;
        self.point.plain_offset = plain_offset;
        self
    }

    /// File the factory opens.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw file offset streams are opened at.
    pub fn file_offset(&self) -> u64 {
        self.point.offset
    }
}

impl InputStreamFactory for FileStreamFactory {
    fn create(&self) -> Result<InputStream> {
        tracing::trace!(
            path = %self.path.display(),
            offset = self.point.offset,
            plain_offset = self.point.plain_offset,
            "reopening file stream"
        );
        let stream = InputStream::open_with_config(&self.path, self.point.offset, self.point.config)?;
        self.point.apply(stream)
    }
}

/// Reopens bytes held in memory.
#[derive(Clone)]
pub struct MemoryStreamFactory {
    data: Rc<[u8]>,
    point: ReopenPoint,
}

impl fmt::Debug for MemoryStreamFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStreamFactory")
            .field("len", &self.data.len())
            .field("point", &self.point)
            .finish()
    }
}

impl MemoryStreamFactory {
    /// Factory for `data` from its first byte.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self::from_shared(Rc::from(data.into()), 0)
    }

    pub(crate) fn from_shared(data: Rc<[u8]>, offset: u64) -> Self {
        Self {
            data,
            point: ReopenPoint::new(offset),
        }
    }

    /// Use `config` for streams and filters created by this factory.
    pub fn with_config(mut self, config: FilterConfig) -> Self {
        self.point.config = config;
        self
    }

    /// See [`FileStreamFactory::with_compression`].
    pub fn with_compression(mut self, compression: StreamCompression, plain_offset: u64) -> Self {
        self.point.compression = compression;
        self.point.plain_offset = plain_offset;
        self
    }
}

impl InputStreamFactory for MemoryStreamFactory {
    fn create(&self) -> Result<InputStream> {
        let stream = InputStream::from_shared(Rc::clone(&self.data), self.point.offset, self.point.config);
        self.point.apply(stream)
    }
}

/// Reopens a temporary file; keeps the file alive while the factory exists.
#[derive(Debug, Clone)]
pub struct TempFileStreamFactory {
    handler: Arc<TempFileHandler>,
    point: ReopenPoint,
}

impl TempFileStreamFactory {
    /// Factory for the temporary file starting at `offset`.
    pub fn new(handler: Arc<TempFileHandler>, offset: u64) -> Self {
        Self {
            handler,
            point: ReopenPoint::new(offset),
        }
    }

    /// Use `config` for streams and filters created by this factory.
    pub fn with_config(mut self, config: FilterConfig) -> Self {
        self.point.config = config;
        self
    }

    /// See [`FileStreamFactory::with_compression`].
    pub fn with_compression(mut self, compression: StreamCompression, plain_offset: u64) -> Self {
        self.point.compression = compression;
        self.point.plain_offset = plain_offset;
        self
    }
}

impl InputStreamFactory for TempFileStreamFactory {
    fn create(&self) -> Result<InputStream> {
        let stream =
            InputStream::open_temp(Arc::clone(&self.handler), self.point.offset, self.point.config)?;
        self.point.apply(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::OutputStream;
    use medstream_core::error::StreamError;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 13 % 256) as u8).collect()
    }

    #[test]
    fn test_memory_factory_reopens_at_position() {
        let data = sample(500);
        let mut stream = InputStream::from_bytes(data.clone());
        stream.skip_fully(123).unwrap();
        let factory = stream.new_factory().unwrap();

        stream.skip_fully(200).unwrap();
        let mut reopened = factory.create().unwrap();
        let mut buf = [0u8; 10];
        reopened.read_fully(&mut buf).unwrap();
        assert_eq!(&buf[..], &data[123..133]);
    }

    #[test]
    fn test_memory_factory_shares_the_value() {
        let data: Rc<[u8]> = Rc::from(sample(100_000));
        let factory = MemoryStreamFactory::from_shared(Rc::clone(&data), 40_000);
        let before = Rc::strong_count(&data);

        let first = factory.create().unwrap();
        let per_stream = Rc::strong_count(&data) - before;
        assert!(per_stream > 0);

        // Every reopen only adds references to the one buffer.
        let mut streams = vec![first];
        for _ in 0..3 {
            streams.push(factory.create().unwrap());
        }
        assert_eq!(Rc::strong_count(&data), before + 4 * per_stream);

        let mut buf = [0u8; 8];
        for stream in &mut streams {
            stream.read_fully(&mut buf).unwrap();
            assert_eq!(&buf[..], &data[40_000..40_008]);
        }

        drop(streams);
        assert_eq!(Rc::strong_count(&data), before);
    }

    #[test]
    fn test_file_factory_over_compressed_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deflated.bin");
        let body = sample(30_000);

        let mut out = OutputStream::create(&path).unwrap();
        out.write(b"PREAMBLE").unwrap();
        out.install_compression_filter(StreamCompression::Zlib)
            .unwrap();
        assert_eq!(out.write(&body).unwrap(), body.len());
        out.flush().unwrap();
        drop(out);

        let mut stream = InputStream::open(&path, 0).unwrap();
        stream.skip_fully(8).unwrap();
        stream
            .install_compression_filter(StreamCompression::Zlib)
            .unwrap();
        stream.skip_fully(20_000).unwrap();
        let factory = stream.new_factory().unwrap();

        let mut reopened = factory.create().unwrap();
        assert_eq!(reopened.compression(), StreamCompression::Zlib);
        let mut buf = vec![0u8; 10_000];
        reopened.read_fully(&mut buf).unwrap();
        assert_eq!(&buf[..], &body[20_000..]);
    }

    #[test]
    fn test_file_factory_past_end_reports_eof() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.bin");
        std::fs::write(&path, b"abc").unwrap();

        let factory = FileStreamFactory::new(&path, 0)
            .with_compression(StreamCompression::None, 10);
        assert!(matches!(
            factory.create(),
            Err(StreamError::UnexpectedEof { .. })
        ));
        assert_eq!(factory.file_offset(), 0);
        assert_eq!(factory.path(), path.as_path());
    }

    #[test]
    fn test_temp_factory_keeps_file() {
        let handler = TempFileHandler::create().unwrap();
        let path = handler.path().to_path_buf();
        {
            let mut out = handler.output_stream().unwrap();
            out.write(b"0123456789").unwrap();
            out.flush().unwrap();
        }

        let factory = TempFileStreamFactory::new(handler, 4);
        assert!(path.exists());
        let mut stream = factory.create().unwrap();
        let mut buf = [0u8; 3];
        stream.read_fully(&mut buf).unwrap();
        assert_eq!(&buf, b"456");
        drop(stream);
        drop(factory);
        assert!(!path.exists());
    }
}
