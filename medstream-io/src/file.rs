//! File and standard-output terminal adapters.
//!
//! [`FileProducer`] reads a regular file from a byte offset; putback is a
//! relative seek, so any byte already delivered can be served again.
//! [`FileConsumer`] writes to a file or to standard output. Neither side ever
//! suspends: files block in the kernel instead.

use medstream_core::error::{Result, StickyStatus, StreamError};
use medstream_core::traits::{ByteConsumer, ByteProducer};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A producer over a regular file.
#[derive(Debug)]
pub struct FileProducer {
    reader: BufReader<File>,
    path: PathBuf,
    /// Absolute file position of the next byte.
    position: u64,
    size: u64,
    status: StickyStatus,
}

impl FileProducer {
    /// Open `path` and position the producer at `offset`.
    ///
    /// An offset past the end of the file yields an empty producer.
    pub fn open<P: AsRef<Path>>(path: P, offset: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let size = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(offset))?;

        tracing::trace!(path = %path.display(), offset, size, "file producer opened");
        Ok(Self {
            reader,
            path,
            position: offset,
            size,
            status: StickyStatus::new(),
        })
    }

    /// Path the producer reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Absolute file position of the next byte.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn remaining(&self) -> u64 {
        self.size.saturating_sub(self.position)
    }
}

impl ByteProducer for FileProducer {
    fn status(&self) -> Result<()> {
        self.status.check()
    }

    fn eos(&self) -> bool {
        self.status.good() && self.remaining() == 0
    }

    fn avail(&mut self) -> u64 {
        if !self.status.good() {
            return 0;
        }
        self.remaining()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        if !self.status.good() {
            return 0;
        }

        let mut total = 0;
        while total < buf.len() {
            match self.reader.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.status.fail(e.into());
                    break;
                }
            }
        }
        self.position += total as u64;
        total
    }

    fn skip(&mut self, n: u64) -> u64 {
        if !self.status.good() {
            return 0;
        }
        let step = n.min(self.remaining());
        if step == 0 {
            return 0;
        }
        match self.reader.seek_relative(step as i64) {
            Ok(()) => {
                self.position += step;
                step
            }
            Err(e) => {
                self.status.fail(e.into());
                0
            }
        }
    }

    fn putback(&mut self, n: u64) {
        if !self.status.good() || n == 0 {
            return;
        }
        if n > self.position {
            self.status
                .fail(StreamError::putback_failed(n, self.position));
            return;
        }
        match self.reader.seek_relative(-(n as i64)) {
            Ok(()) => self.position -= n,
            Err(e) => self.status.fail(e.into()),
        }
    }
}

#[derive(Debug)]
enum Sink {
    File(BufWriter<File>),
    Stdout(io::Stdout),
}

impl Sink {
    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::File(w) => w,
            Self::Stdout(w) => w,
        }
    }
}

/// A consumer writing to a file or to standard output.
#[derive(Debug)]
pub struct FileConsumer {
    sink: Sink,
    dirty: bool,
    status: StickyStatus,
}

impl FileConsumer {
    /// Create (or truncate) the file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self::from_file(file))
    }

    /// Write to an already open file, starting at its current position.
    pub fn from_file(file: File) -> Self {
        Self {
            sink: Sink::File(BufWriter::new(file)),
            dirty: false,
            status: StickyStatus::new(),
        }
    }

    /// Write to the process's standard output.
    pub fn stdout() -> Self {
        Self {
            sink: Sink::Stdout(io::stdout()),
            dirty: false,
            status: StickyStatus::new(),
        }
    }
}

impl ByteConsumer for FileConsumer {
    fn status(&self) -> Result<()> {
        self.status.check()
    }

    fn is_flushed(&self) -> bool {
        !self.dirty
    }

    fn avail(&self) -> u64 {
        if !self.status.good() {
            return 0;
        }
        u64::MAX
    }

    fn write(&mut self, buf: &[u8]) -> usize {
        if !self.status.good() || buf.is_empty() {
            return 0;
        }
        match self.sink.writer().write_all(buf) {
            Ok(()) => {
                self.dirty = true;
                buf.len()
            }
            Err(e) => {
                self.status.fail(e.into());
                0
            }
        }
    }

    fn flush(&mut self) {
        if !self.status.good() {
            return;
        }
        match self.sink.writer().flush() {
            Ok(()) => self.dirty = false,
            Err(e) => self.status.fail(e.into()),
        }
    }
}
