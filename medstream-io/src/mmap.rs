//! Memory-mapped file producer.
//!
//! Maps a whole file read-only and serves it as a [`ByteProducer`]. Reads are
//! plain copies out of the mapping and putback can rewind to any byte of the
//! mapping, which suits parsers that sniff large files repeatedly.
//!
//! # Example
//!
//! ```no_run
//! use medstream_core::traits::ByteProducer;
//! use medstream_io::mmap::MmapProducer;
//!
//! let mut producer = MmapProducer::open("image.dcm", 128).unwrap();
//! let mut magic = [0u8; 4];
//! producer.read(&mut magic);
//! assert_eq!(&magic, b"DICM");
//! ```
//!
//! # Safety
//!
//! Memory-mapped files can be dangerous if the underlying file is modified by
//! another process while mapped. The mapping is read-only, but the caller
//! remains responsible for keeping the file stable.

use medstream_core::error::{Result, StickyStatus, StreamError};
use medstream_core::traits::ByteProducer;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// A producer over a read-only memory mapping.
///
/// The mapping is shared through an [`Arc`]; [`MmapProducer::reopen`] creates
/// an independent producer over the same mapping.
#[derive(Debug)]
pub struct MmapProducer {
    mmap: Arc<Mmap>,
    position: usize,
    status: StickyStatus,
}

impl MmapProducer {
    /// Map the file at `path` and position the producer at `offset`.
    pub fn open<P: AsRef<Path>>(path: P, offset: u64) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_file(&file, offset)
    }

    /// Map an already open file. Offsets past the end give an empty
    /// producer.
    pub fn from_file(file: &File, offset: u64) -> Result<Self> {
        // SAFETY: read-only mapping; the caller keeps the file stable.
        let mmap = unsafe { Mmap::map(file)? };
        let position = usize::try_from(offset)
            .map_err(|_| StreamError::illegal_call("offset does not fit the address space"))?
            .min(mmap.len());
        Ok(Self {
            mmap: Arc::new(mmap),
            position,
            status: StickyStatus::new(),
        })
    }

    /// Independent producer over the same mapping at `offset`.
    pub fn reopen(&self, offset: u64) -> Self {
        Self {
            mmap: Arc::clone(&self.mmap),
            position: usize::try_from(offset)
                .unwrap_or(usize::MAX)
                .min(self.mmap.len()),
            status: StickyStatus::new(),
        }
    }

    /// Total length of the mapped file.
    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// `true` if the mapped file is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Offset of the next byte.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes from the current position to the end of the mapping.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.position)
    }

    /// The unread part of the mapping.
    #[inline]
    pub fn remaining_slice(&self) -> &[u8] {
        if self.position >= self.len() {
            &[]
        } else {
            &self.mmap[self.position..]
        }
    }
}

impl ByteProducer for MmapProducer {
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
        self.remaining() as u64
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        if !self.status.good() {
            return 0;
        }
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.remaining_slice()[..n]);
        self.position += n;
        n
    }

    fn skip(&mut self, n: u64) -> u64 {
        if !self.status.good() {
            return 0;
        }
        let step = (self.remaining() as u64).min(n);
        self.position += step as usize;
        step
    }

    fn putback(&mut self, n: u64) {
        if !self.status.good() {
            return;
        }
        let available = self.position as u64;
        if n > available {
            self.status.fail(StreamError::putback_failed(n, available));
            return;
        }
        self.position -= n as usize;
    }
}
