//! Input and output streams.
//!
//! A stream owns the head of a filter chain: a terminal adapter, or a
//! compression filter wrapping one. It counts the bytes it has transferred
//! (`tell`), supports a single mark for bounded rewind, and keeps a sticky
//! status of its own so that callers see `Result`s while the chain below
//! speaks in counts.
//!
//! ```text
//! InputStream ──▶ ZlibInputFilter ──▶ FileProducer
//!            tell/mark      plain ring      file
//! ```
//!
//! At most one compression filter can ever be installed on a stream.

use crate::factory::{FileStreamFactory, InputStreamFactory, MemoryStreamFactory, TempFileStreamFactory};
use crate::file::{FileConsumer, FileProducer};
use crate::temp::TempFileHandler;
use medstream_core::config::FilterConfig;
use medstream_core::error::{Result, StickyStatus, StreamError};
use medstream_core::memory::{MemoryConsumer, MemoryProducer};
use medstream_core::traits::{
    ByteConsumer, ByteProducer, InputFilter, OutputFilter, StreamCompression,
};
use medstream_zlib::{ZlibInputFilter, ZlibOutputFilter};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

/// Where an input stream's bytes come from, for reopening.
#[derive(Clone)]
pub(crate) enum Origin {
    File(PathBuf),
    Memory(Rc<[u8]>),
    Temp(Arc<TempFileHandler>),
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Memory(data) => write!(f, "Memory({} bytes)", data.len()),
            Self::Temp(handler) => f.debug_tuple("Temp").field(&handler.path()).finish(),
        }
    }
}

fn check_installable(current: StreamCompression, kind: StreamCompression) -> Result<()> {
    if current != StreamCompression::None {
        return Err(StreamError::DoubleCompressionFilters);
    }
    match kind {
        StreamCompression::Zlib => Ok(()),
        other => Err(StreamError::unsupported_encoding(other.to_string())),
    }
}

/// A readable stream over a producer chain.
#[derive(Debug)]
pub struct InputStream {
    head: Box<dyn ByteProducer>,
    status: StickyStatus,
    tell: u64,
    mark: Option<u64>,
    compression: StreamCompression,
    config: FilterConfig,
    origin: Option<Origin>,
    /// Offset within the origin at which the stream was opened.
    base_offset: u64,
    /// `tell` at the moment the compression filter was installed.
    compressed_from: Option<u64>,
}

impl InputStream {
    /// Wrap an arbitrary producer. Such a stream cannot be reopened through
    /// [`new_factory`](Self::new_factory).
    pub fn new(producer: Box<dyn ByteProducer>) -> Self {
        Self::with_config(producer, FilterConfig::global())
    }

    /// Wrap a producer; filters installed later use `config`.
    pub fn with_config(producer: Box<dyn ByteProducer>, config: FilterConfig) -> Self {
        Self {
            head: producer,
            status: StickyStatus::new(),
            tell: 0,
            mark: None,
            compression: StreamCompression::None,
            config,
            origin: None,
            base_offset: 0,
            compressed_from: None,
        }
    }

    /// Open the file at `path`, starting at `offset`.
    pub fn open<P: AsRef<Path>>(path: P, offset: u64) -> Result<Self> {
        Self::open_with_config(path, offset, FilterConfig::global())
    }

    /// Open the file at `path` with an explicit filter configuration.
    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        offset: u64,
        config: FilterConfig,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let producer = FileProducer::open(&path, offset)?;
        let mut stream = Self::with_config(Box::new(producer), config);
        stream.origin = Some(Origin::File(path));
        stream.base_offset = offset;
        Ok(stream)
    }

    /// Stream over bytes held in memory.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::from_shared(Rc::from(data.into()), 0, FilterConfig::global())
    }

    pub(crate) fn from_shared(data: Rc<[u8]>, offset: u64, config: FilterConfig) -> Self {
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let producer = MemoryProducer::from_shared(Rc::clone(&data), start);
        let mut stream = Self::with_config(Box::new(producer), config);
        stream.origin = Some(Origin::Memory(data));
        stream.base_offset = start as u64;
        stream
    }

    pub(crate) fn open_temp(
        handler: Arc<TempFileHandler>,
        offset: u64,
        config: FilterConfig,
    ) -> Result<Self> {
        let producer = FileProducer::open(handler.path(), offset)?;
        let mut stream = Self::with_config(Box::new(producer), config);
        stream.origin = Some(Origin::Temp(handler));
        stream.base_offset = offset;
        Ok(stream)
    }

    /// `Ok(())` while usable, otherwise the first error of the stream or its
    /// chain.
    pub fn status(&self) -> Result<()> {
        self.status.check()
    }

    /// `true` while no error has been recorded.
    pub fn good(&self) -> bool {
        self.status.good()
    }

    /// Pull a chain error into the stream's own status.
    fn sync(&mut self) -> Result<()> {
        if let Err(err) = self.head.status() {
            self.status.fail(err);
        }
        self.status.check()
    }

    /// `true` once the chain will never produce another byte.
    pub fn eos(&self) -> bool {
        self.head.eos()
    }

    /// Bytes readable without suspension.
    pub fn avail(&mut self) -> u64 {
        if !self.status.good() {
            return 0;
        }
        let n = self.head.avail();
        let _ = self.sync();
        n
    }

    /// Read up to `buf.len()` bytes; a short count is suspension.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.status.check()?;
        let n = self.head.read(buf);
        self.tell += n as u64;
        self.sync()?;
        Ok(n)
    }

    /// Skip up to `n` bytes; a short count is suspension.
    pub fn skip(&mut self, n: u64) -> Result<u64> {
        self.status.check()?;
        let skipped = self.head.skip(n);
        self.tell += skipped;
        self.sync()?;
        Ok(skipped)
    }

    /// Fill `buf` completely.
    ///
    /// Fails with [`StreamError::UnexpectedEof`] if the stream ends first, or
    /// with an [`io::ErrorKind::WouldBlock`] I/O error if the chain suspends.
    pub fn read_fully(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut done = 0;
        while done < buf.len() {
            let n = self.read(&mut buf[done..])?;
            if n == 0 {
                return Err(self.stalled((buf.len() - done) as u64));
            }
            done += n;
        }
        Ok(())
    }

    /// Skip exactly `n` bytes, with the failure modes of
    /// [`read_fully`](Self::read_fully).
    pub fn skip_fully(&mut self, mut n: u64) -> Result<()> {
        while n > 0 {
            let skipped = self.skip(n)?;
            if skipped == 0 {
                return Err(self.stalled(n));
            }
            n -= skipped;
        }
        Ok(())
    }

    fn stalled(&self, missing: u64) -> StreamError {
        if self.eos() {
            StreamError::unexpected_eof(missing)
        } else {
            io::Error::from(io::ErrorKind::WouldBlock).into()
        }
    }

    /// Bytes delivered so far, net of putbacks.
    pub fn tell(&self) -> u64 {
        self.tell
    }

    /// Remember the current position for [`putback`](Self::putback).
    pub fn mark(&mut self) {
        self.mark = Some(self.tell);
    }

    /// Rewind to the last mark.
    pub fn putback(&mut self) -> Result<()> {
        self.status.check()?;
        let Some(mark) = self.mark else {
            let err = StreamError::illegal_call("putback without a preceding mark");
            self.status.fail(err.clone());
            return Err(err);
        };
        let n = self.tell.saturating_sub(mark);
        if n > 0 {
            self.head.putback(n);
            self.sync()?;
        }
        self.tell = mark;
        Ok(())
    }

    /// Compression installed on this stream.
    pub fn compression(&self) -> StreamCompression {
        self.compression
    }

    /// Filter configuration used for filters installed on this stream.
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Put a decompression filter in front of the current chain.
    ///
    /// The filter immediately pulls and decodes its first block. A stream
    /// accepts one filter in its lifetime; the first one keeps working when
    /// a second is refused.
    pub fn install_compression_filter(&mut self, kind: StreamCompression) -> Result<()> {
        self.status.check()?;
        check_installable(self.compression, kind)?;

        let mut filter = ZlibInputFilter::with_config(&self.config)?;
        let upstream = std::mem::replace(&mut self.head, Box::new(MemoryProducer::new(Vec::new())));
        filter.append(upstream)?;
        filter.skip(0);
        self.head = Box::new(filter);
        self.compression = kind;
        self.compressed_from = Some(self.tell);

        tracing::debug!(
            %kind,
            tell = self.tell,
            level = self.config.level.level(),
            rfc1950 = self.config.expect_rfc1950,
            "input compression filter installed"
        );
        self.sync()
    }

    /// Factory that reopens this stream's source at the current position.
    ///
    /// Streams built from an arbitrary producer cannot be reopened and yield
    /// [`StreamError::IllegalCall`].
    pub fn new_factory(&self) -> Result<Box<dyn InputStreamFactory>> {
        let origin = self
            .origin
            .as_ref()
            .ok_or_else(|| StreamError::illegal_call("stream has no reopenable source"))?;

        let (offset, plain_offset) = match self.compressed_from {
            None => (self.base_offset + self.tell, 0),
            Some(at) => (self.base_offset + at, self.tell.saturating_sub(at)),
        };

        let factory: Box<dyn InputStreamFactory> = match origin {
            Origin::File(path) => Box::new(
                FileStreamFactory::new(path.clone(), offset)
                    .with_config(self.config)
                    .with_compression(self.compression, plain_offset),
            ),
            Origin::Memory(data) => Box::new(
                MemoryStreamFactory::from_shared(Rc::clone(data), offset)
                    .with_config(self.config)
                    .with_compression(self.compression, plain_offset),
            ),
            Origin::Temp(handler) => Box::new(
                TempFileStreamFactory::new(Arc::clone(handler), offset)
                    .with_config(self.config)
                    .with_compression(self.compression, plain_offset),
            ),
        };
        Ok(factory)
    }
}

impl io::Read for InputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = InputStream::read(self, buf)?;
        if n == 0 && !self.eos() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        Ok(n)
    }
}

/// A writable stream over a consumer chain.
#[derive(Debug)]
pub struct OutputStream {
    head: Box<dyn ByteConsumer>,
    status: StickyStatus,
    tell: u64,
    compression: StreamCompression,
    config: FilterConfig,
}

impl OutputStream {
    /// Wrap an arbitrary consumer.
    pub fn new(consumer: Box<dyn ByteConsumer>) -> Self {
        Self::with_config(consumer, FilterConfig::global())
    }

    /// Wrap a consumer; filters installed later use `config`.
    pub fn with_config(consumer: Box<dyn ByteConsumer>, config: FilterConfig) -> Self {
        Self {
            head: consumer,
            status: StickyStatus::new(),
            tell: 0,
            compression: StreamCompression::None,
            config,
        }
    }

    /// Create (or truncate) the file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(Box::new(FileConsumer::create(path)?)))
    }

    /// Create (or truncate) the file at `path` with an explicit filter
    /// configuration.
    pub fn create_with_config<P: AsRef<Path>>(path: P, config: FilterConfig) -> Result<Self> {
        Ok(Self::with_config(
            Box::new(FileConsumer::create(path)?),
            config,
        ))
    }

    /// Write to an already open file.
    pub fn from_file(file: File) -> Self {
        Self::new(Box::new(FileConsumer::from_file(file)))
    }

    /// Write to standard output.
    pub fn stdout() -> Self {
        Self::new(Box::new(FileConsumer::stdout()))
    }

    /// `Ok(())` while usable, otherwise the first error of the stream or its
    /// chain.
    pub fn status(&self) -> Result<()> {
        self.status.check()
    }

    /// `true` while no error has been recorded.
    pub fn good(&self) -> bool {
        self.status.good()
    }

    fn sync(&mut self) -> Result<()> {
        if let Err(err) = self.head.status() {
            self.status.fail(err);
        }
        self.status.check()
    }

    /// Bytes the next write accepts without suspension.
    pub fn avail(&self) -> u64 {
        if !self.status.good() {
            return 0;
        }
        self.head.avail()
    }

    /// Write up to `buf.len()` bytes; a short count is suspension.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.status.check()?;
        let n = self.head.write(buf);
        self.tell += n as u64;
        self.sync()?;
        Ok(n)
    }

    /// Drive buffered bytes towards the terminal. With a compression filter
    /// installed this also finalizes the compressed stream.
    pub fn flush(&mut self) -> Result<()> {
        self.status.check()?;
        self.head.flush();
        self.sync()
    }

    /// `true` once every byte written has reached the terminal.
    pub fn is_flushed(&self) -> bool {
        self.head.is_flushed()
    }

    /// Bytes accepted so far.
    pub fn tell(&self) -> u64 {
        self.tell
    }

    /// Compression installed on this stream.
    pub fn compression(&self) -> StreamCompression {
        self.compression
    }

    /// Put a compression filter in front of the current chain.
    pub fn install_compression_filter(&mut self, kind: StreamCompression) -> Result<()> {
        self.status.check()?;
        check_installable(self.compression, kind)?;

        let mut filter = ZlibOutputFilter::with_config(&self.config)?;
        let placeholder = Box::new(MemoryConsumer::unbounded().0);
        let downstream = std::mem::replace(&mut self.head, placeholder);
        filter.append(downstream)?;
        self.head = Box::new(filter);
        self.compression = kind;

        tracing::debug!(
            %kind,
            tell = self.tell,
            level = self.config.level.level(),
            "output compression filter installed"
        );
        Ok(())
    }
}

impl io::Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match OutputStream::write(self, buf)? {
            0 => Err(io::ErrorKind::WouldBlock.into()),
            n => Ok(n),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        OutputStream::flush(self)?;
        if self.is_flushed() {
            Ok(())
        } else {
            Err(io::ErrorKind::WouldBlock.into())
        }
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        if self.status.good() && !self.head.is_flushed() {
            tracing::warn!(
                tell = self.tell,
                compression = %self.compression,
                "output stream dropped with unflushed data"
            );
        }
    }
}
