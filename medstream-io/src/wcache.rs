//! Write cache.
//!
//! Writing a value that is not held in memory means copying it from its
//! source into an output stream that may accept only part of each write.
//! The write cache stages one 64 KiB block at a time: it pulls a block from
//! the [`ValueSource`] (through its own [`ReadCache`]) and hands it to the
//! output stream over as many calls as needed.

use crate::cache::ReadCache;
use crate::stream::OutputStream;
use crate::value::{ByteOrder, OwnerId, ValueSource};
use medstream_core::error::{Result, StreamError};

/// Size of the staging buffer.
pub const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Staging buffer for one value being written.
#[derive(Debug)]
pub struct WriteCache {
    buffer: Vec<u8>,
    owner: Option<OwnerId>,
    field_length: u64,
    /// Bytes of the field pulled into the buffer so far.
    field_offset: u64,
    byte_order: ByteOrder,
    /// Start of the staged content in `buffer`.
    buffer_offset: usize,
    /// Number of staged bytes.
    num_bytes: usize,
    read_cache: ReadCache,
}

impl Default for WriteCache {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteCache {
    /// Empty cache; the buffer is allocated on first use.
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            owner: None,
            field_length: 0,
            field_offset: 0,
            byte_order: ByteOrder::Little,
            buffer_offset: 0,
            num_bytes: 0,
            read_cache: ReadCache::new(),
        }
    }

    /// Prepare to write `field_length` bytes for `owner`, of which
    /// `bytes_transferred` were written before.
    ///
    /// Repeated calls by the same owner leave the state untouched.
    pub fn init(
        &mut self,
        owner: OwnerId,
        field_length: u64,
        bytes_transferred: u64,
        byte_order: ByteOrder,
    ) {
        if self.owner == Some(owner) {
            return;
        }
        tracing::trace!(?owner, field_length, bytes_transferred, "write cache reinitialized");
        self.owner = Some(owner);
        self.field_length = field_length;
        self.field_offset = bytes_transferred.min(field_length);
        self.byte_order = byte_order;
        self.buffer_offset = 0;
        self.num_bytes = 0;
        self.read_cache.clear();
    }

    /// `true` when no staged bytes are waiting.
    pub fn buffer_is_empty(&self) -> bool {
        self.num_bytes == 0
    }

    /// Number of staged bytes.
    pub fn content_length(&self) -> usize {
        self.num_bytes
    }

    /// Bytes of the field handed to output streams so far.
    pub fn written(&self) -> u64 {
        self.field_offset - self.num_bytes as u64
    }

    /// `true` once the whole field was handed to output streams.
    pub fn is_complete(&self) -> bool {
        self.owner.is_some() && self.written() == self.field_length
    }

    fn ensure_buffer(&mut self) -> Result<()> {
        if self.buffer.len() < WRITE_BUFFER_SIZE {
            self.buffer
                .try_reserve_exact(WRITE_BUFFER_SIZE - self.buffer.len())
                .map_err(|_| StreamError::memory_exhausted(WRITE_BUFFER_SIZE))?;
            self.buffer.resize(WRITE_BUFFER_SIZE, 0);
        }
        Ok(())
    }

    /// Stage the next block of `source` if the buffer is empty.
    pub fn fill_buffer(&mut self, source: &dyn ValueSource) -> Result<()> {
        if self.owner != Some(source.owner()) {
            return Err(StreamError::illegal_call(
                "write cache filled for a value it was not initialized for",
            ));
        }
        if self.num_bytes > 0 || self.field_offset >= self.field_length {
            return Ok(());
        }
        self.ensure_buffer()?;

        let n = (self.field_length - self.field_offset).min(WRITE_BUFFER_SIZE as u64) as usize;
        source.read_partial(
            &mut self.buffer[..n],
            self.field_offset,
            &mut self.read_cache,
            self.byte_order,
        )?;
        self.buffer_offset = 0;
        self.num_bytes = n;
        self.field_offset += n as u64;
        Ok(())
    }

    /// Write as much staged content as `out` accepts in one call.
    pub fn write_buffer(&mut self, out: &mut OutputStream) -> Result<usize> {
        if self.num_bytes == 0 {
            return Ok(0);
        }
        let staged = &self.buffer[self.buffer_offset..self.buffer_offset + self.num_bytes];
        let n = out.write(staged)?;
        self.buffer_offset += n;
        self.num_bytes -= n;
        Ok(n)
    }

    /// Copy `source` into `out` until the field is complete or `out` stops
    /// accepting whole blocks. Returns the bytes written by this call.
    pub fn transfer(&mut self, source: &dyn ValueSource, out: &mut OutputStream) -> Result<u64> {
        let mut total = 0u64;
        while self.written() < self.field_length {
            self.fill_buffer(source)?;
            let staged = self.content_length();
            let n = self.write_buffer(out)?;
            total += n as u64;
            if n < staged {
                break;
            }
        }
        Ok(total)
    }
}
