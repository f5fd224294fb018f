//! Partial access to element values.
//!
//! Large values are usually left where they are (in the file they were
//! parsed from, or in a temporary file) and read back piecewise. A
//! [`ValueSource`] serves `read_partial` requests through a caller-supplied
//! [`ReadCache`], so consecutive small reads of one value share a single
//! open stream and only skip forward.

use crate::cache::ReadCache;
use crate::factory::InputStreamFactory;
use medstream_core::error::{Result, StreamError};
use std::sync::atomic::{AtomicU64, Ordering};

/// Byte order of multi-byte words in a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

impl ByteOrder {
    /// Byte order of the running machine.
    #[cfg(target_endian = "little")]
    pub const NATIVE: Self = Self::Little;
    /// Byte order of the running machine.
    #[cfg(target_endian = "big")]
    pub const NATIVE: Self = Self::Big;
}

/// Identity of a cache user, unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(u64);

impl OwnerId {
    /// Allocate a fresh identity.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Reverse every `word_size`-byte word of `buf` in place.
pub fn swap_words(buf: &mut [u8], word_size: usize) {
    if word_size < 2 {
        return;
    }
    for word in buf.chunks_exact_mut(word_size) {
        word.reverse();
    }
}

/// A value that can be read in pieces.
pub trait ValueSource {
    /// Identity used as the cache owner.
    fn owner(&self) -> OwnerId;

    /// Length of the value in bytes.
    fn length(&self) -> u64;

    /// Fill `buf` with the value bytes starting at `offset`, in
    /// `byte_order`.
    fn read_partial(
        &self,
        buf: &mut [u8],
        offset: u64,
        cache: &mut ReadCache,
        byte_order: ByteOrder,
    ) -> Result<()>;
}

/// Range and alignment checks shared by value sources.
fn check_request(len: usize, offset: u64, length: u64, word_size: usize, swap: bool) -> Result<()> {
    let end = offset
        .checked_add(len as u64)
        .ok_or_else(|| StreamError::illegal_call("partial read range overflows"))?;
    if end > length {
        return Err(StreamError::illegal_call(format!(
            "partial read of {len} bytes at {offset} exceeds value length {length}"
        )));
    }
    if swap && word_size > 1 && (offset % word_size as u64 != 0 || len % word_size != 0) {
        return Err(StreamError::illegal_call(format!(
            "partial read at {offset} of {len} bytes is not aligned to {word_size}-byte words"
        )));
    }
    Ok(())
}

/// A value left in a stream, reopened through a factory on demand.
#[derive(Debug)]
pub struct StreamedValue {
    owner: OwnerId,
    factory: Box<dyn InputStreamFactory>,
    length: u64,
    stored_order: ByteOrder,
    word_size: usize,
}

impl StreamedValue {
    /// Value of `length` bytes at the position `factory` reopens, stored
    /// as `word_size`-byte words in `stored_order`.
    pub fn new(
        factory: Box<dyn InputStreamFactory>,
        length: u64,
        stored_order: ByteOrder,
        word_size: usize,
    ) -> Self {
        Self {
            owner: OwnerId::next(),
            factory,
            length,
            stored_order,
            word_size: word_size.max(1),
        }
    }

    /// Byte order the value is stored in.
    pub fn stored_order(&self) -> ByteOrder {
        self.stored_order
    }
}

impl ValueSource for StreamedValue {
    fn owner(&self) -> OwnerId {
        self.owner
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn read_partial(
        &self,
        buf: &mut [u8],
        offset: u64,
        cache: &mut ReadCache,
        byte_order: ByteOrder,
    ) -> Result<()> {
        let swap = byte_order != self.stored_order;
        check_request(buf.len(), offset, self.length, self.word_size, swap)?;
        if buf.is_empty() {
            return Ok(());
        }

        cache.acquire(self.owner, || self.factory.create())?;

        // A stream can only move forward; reopen when the request lies behind.
        let behind = cache.position().is_none_or(|position| position > offset);
        if behind {
            tracing::debug!(offset, "partial read behind cached stream, reopening");
            cache.init(self.factory.create()?, self.owner);
        }

        let position = cache.position().unwrap_or(0);
        let stream = cache
            .stream_mut()
            .ok_or_else(|| StreamError::illegal_call("read cache holds no stream"))?;
        stream.skip_fully(offset - position)?;
        stream.read_fully(buf)?;

        if swap {
            swap_words(buf, self.word_size);
        }
        Ok(())
    }
}

/// A value already held in memory.
#[derive(Debug, Clone)]
pub struct MemoryValue {
    owner: OwnerId,
    data: Vec<u8>,
    stored_order: ByteOrder,
    word_size: usize,
}

impl MemoryValue {
    /// Wrap `data`, stored as `word_size`-byte words in `stored_order`.
    pub fn new(data: Vec<u8>, stored_order: ByteOrder, word_size: usize) -> Self {
        Self {
            owner: OwnerId::next(),
            data,
            stored_order,
            word_size: word_size.max(1),
        }
    }

    /// The stored bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl ValueSource for MemoryValue {
    fn owner(&self) -> OwnerId {
        self.owner
    }

    fn length(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_partial(
        &self,
        buf: &mut [u8],
        offset: u64,
        _cache: &mut ReadCache,
        byte_order: ByteOrder,
    ) -> Result<()> {
        let swap = byte_order != self.stored_order;
        check_request(buf.len(), offset, self.length(), self.word_size, swap)?;
        let start = offset as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        if swap {
            swap_words(buf, self.word_size);
        }
        Ok(())
    }
}
