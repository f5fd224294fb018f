//! Fixed-capacity circular byte buffer.
//!
//! The buffer decouples a producer and a consumer that run at different
//! rates: bytes are committed at the logical end and consumed from the
//! logical start. Content and free space may both wrap around the end of the
//! underlying storage, so every fill or drain is expressed as at most two
//! contiguous runs (before and after the wrap).
//!
//! A ring may also retain a bounded *history* of already-consumed bytes
//! directly behind its start. Those bytes are never overwritten while
//! retained, which lets [`RingBuffer::unconsume`] serve putback requests
//! without recomputing data.
//!
//! # Invariants
//!
//! - `start < capacity`
//! - `count + retained <= capacity`
//! - `retained <= history`

use crate::error::{Result, StreamError};

/// Common buffer sizes.
pub mod sizes {
    /// Default size of a filter's working buffers (4 KB).
    pub const FILTER_BUFFER: usize = 4096;
    /// Guaranteed putback window of input chains (1 KB).
    pub const PUTBACK_WINDOW: usize = 1024;
}

/// A circular byte buffer with optional putback history.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    /// The underlying storage.
    buffer: Vec<u8>,
    /// Index of the first readable byte.
    start: usize,
    /// Number of readable bytes.
    count: usize,
    /// Number of consumed bytes kept directly behind `start`.
    retained: usize,
    /// Upper bound for `retained`.
    history: usize,
}

impl RingBuffer {
    /// Create a ring buffer without history.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::with_history(capacity, 0)
    }

    /// Create a ring buffer that retains up to `history` consumed bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not greater than `history`.
    pub fn with_history(capacity: usize, history: usize) -> Self {
        assert!(
            capacity > history,
            "Capacity must be greater than history, got {} <= {}",
            capacity,
            history
        );

        Self {
            buffer: vec![0; capacity],
            start: 0,
            count: 0,
            retained: 0,
            history,
        }
    }

    /// Fallible constructor used by filters; allocation failure becomes
    /// [`StreamError::MemoryExhausted`].
    pub fn try_with_history(capacity: usize, history: usize) -> Result<Self> {
        if capacity <= history {
            return Err(StreamError::illegal_call(format!(
                "ring buffer capacity {capacity} must exceed history {history}"
            )));
        }

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(capacity)
            .map_err(|_| StreamError::memory_exhausted(capacity))?;
        buffer.resize(capacity, 0);

        Ok(Self {
            buffer,
            start: 0,
            count: 0,
            retained: 0,
            history,
        })
    }

    /// Total size of the storage.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of readable bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// `true` when nothing is readable.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of bytes that can be committed without touching retained
    /// history.
    #[inline]
    pub fn free(&self) -> usize {
        self.capacity() - self.count - self.retained
    }

    /// `true` when no byte can be committed.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.free() == 0
    }

    /// Index of the first readable byte.
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of consumed bytes that [`unconsume`](Self::unconsume) can
    /// restore.
    #[inline]
    pub fn retained(&self) -> usize {
        self.retained
    }

    /// Maximum number of consumed bytes kept for putback.
    #[inline]
    pub fn history(&self) -> usize {
        self.history
    }

    /// Index one past the last readable byte.
    #[inline]
    fn end(&self) -> usize {
        (self.start + self.count) % self.capacity()
    }

    /// Drop all content and history.
    pub fn clear(&mut self) {
        self.start = 0;
        self.count = 0;
        self.retained = 0;
    }

    /// Drop retained history; readable content is kept.
    pub fn forget_history(&mut self) {
        self.retained = 0;
    }

    /// Readable content as two runs in logical order.
    ///
    /// The second run is empty unless the content wraps.
    pub fn readable(&self) -> (&[u8], &[u8]) {
        let cap = self.capacity();
        if self.count == 0 {
            return (&[], &[]);
        }
        if self.start + self.count <= cap {
            (&self.buffer[self.start..self.start + self.count], &[])
        } else {
            let first = cap - self.start;
            (
                &self.buffer[self.start..],
                &self.buffer[..self.count - first],
            )
        }
    }

    /// Free space as two runs in logical order.
    ///
    /// Bytes written here become readable after [`commit`](Self::commit).
    pub fn writable_mut(&mut self) -> (&mut [u8], &mut [u8]) {
        let cap = self.capacity();
        let free = self.free();
        if free == 0 {
            return (&mut [], &mut []);
        }
        let end = self.end();
        if end + free <= cap {
            (&mut self.buffer[end..end + free], &mut [])
        } else {
            let first = cap - end;
            let (head, tail) = self.buffer.split_at_mut(end);
            (tail, &mut head[..free - first])
        }
    }

    /// Make `n` bytes of the free space readable.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds [`free`](Self::free).
    pub fn commit(&mut self, n: usize) {
        assert!(n <= self.free(), "commit of {} exceeds free space {}", n, self.free());
        self.count += n;
    }

    /// Consume `n` readable bytes, moving them into the history.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds [`len`](Self::len).
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.count, "consume of {} exceeds content {}", n, self.count);
        self.start = (self.start + n) % self.capacity();
        self.count -= n;
        self.retained = (self.retained + n).min(self.history);
        if self.count == 0 && self.retained == 0 {
            self.start = 0;
        }
    }

    /// Restore the last `n` consumed bytes. Returns `false`, leaving the
    /// buffer untouched, when fewer than `n` bytes are retained.
    pub fn unconsume(&mut self, n: usize) -> bool {
        if n > self.retained {
            return false;
        }
        let cap = self.capacity();
        self.start = (self.start + cap - n) % cap;
        self.count += n;
        self.retained -= n;
        true
    }

    /// Append as much of `data` as fits; returns the number of bytes taken.
    pub fn push(&mut self, data: &[u8]) -> usize {
        let (first, second) = self.writable_mut();
        let a = first.len().min(data.len());
        first[..a].copy_from_slice(&data[..a]);
        let b = second.len().min(data.len() - a);
        second[..b].copy_from_slice(&data[a..a + b]);
        self.commit(a + b);
        a + b
    }

    /// Move as many readable bytes as fit into `out`; returns the count.
    pub fn pop(&mut self, out: &mut [u8]) -> usize {
        let n = self.peek(out);
        self.consume(n);
        n
    }

    /// Copy readable bytes into `out` without consuming them.
    pub fn peek(&self, out: &mut [u8]) -> usize {
        let (first, second) = self.readable();
        let a = first.len().min(out.len());
        out[..a].copy_from_slice(&first[..a]);
        let b = second.len().min(out.len() - a);
        out[a..a + b].copy_from_slice(&second[..b]);
        a + b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ringbuffer_basic() {
        let mut ring = RingBuffer::new(8);

        assert_eq!(ring.push(b"Hello"), 5);
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.free(), 3);

        let mut out = [0u8; 3];
        assert_eq!(ring.pop(&mut out), 3);
        assert_eq!(&out, b"Hel");
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn test_ringbuffer_wrap() {
        let mut ring = RingBuffer::new(4);

        ring.push(b"ABC");
        let mut out = [0u8; 2];
        ring.pop(&mut out);
        assert_eq!(ring.push(b"DEF"), 3); // Wraps around

        let (first, second) = ring.readable();
        assert_eq!(first, b"CD");
        assert_eq!(second, b"EF");

        let mut all = [0u8; 4];
        assert_eq!(ring.pop(&mut all), 4);
        assert_eq!(&all, b"CDEF");
    }

    #[test]
    fn test_ringbuffer_push_truncates_when_full() {
        let mut ring = RingBuffer::new(4);
        assert_eq!(ring.push(b"ABCDEF"), 4);
        assert!(ring.is_full());
        assert_eq!(ring.push(b"G"), 0);
    }

    #[test]
    fn test_writable_runs_split_at_wrap() {
        let mut ring = RingBuffer::new(8);
        ring.push(b"123456");
        let mut out = [0u8; 4];
        ring.pop(&mut out);

        let (first, second) = ring.writable_mut();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 4);
        first.copy_from_slice(b"ab");
        second[..1].copy_from_slice(b"c");
        ring.commit(3);

        let mut rest = [0u8; 5];
        assert_eq!(ring.pop(&mut rest), 5);
        assert_eq!(&rest, b"56abc");
    }

    #[test]
    fn test_history_putback() {
        let mut ring = RingBuffer::with_history(8, 4);
        ring.push(b"ABCD");
        let mut out = [0u8; 3];
        ring.pop(&mut out);
        assert_eq!(ring.retained(), 3);
        // Retained bytes shrink the free space.
        assert_eq!(ring.free(), 8 - 1 - 3);

        assert!(ring.unconsume(2));
        let mut again = [0u8; 3];
        assert_eq!(ring.pop(&mut again), 3);
        assert_eq!(&again, b"BCD");
    }

    #[test]
    fn test_history_is_bounded() {
        let mut ring = RingBuffer::with_history(8, 2);
        ring.push(b"ABCDEF");
        let mut out = [0u8; 6];
        ring.pop(&mut out);
        assert_eq!(ring.retained(), 2);
        assert!(!ring.unconsume(3));
        assert!(ring.unconsume(2));

        let mut tail = [0u8; 2];
        ring.pop(&mut tail);
        assert_eq!(&tail, b"EF");
    }

    #[test]
    fn test_history_is_never_overwritten() {
        let mut ring = RingBuffer::with_history(6, 2);
        ring.push(b"ABCD");
        let mut out = [0u8; 4];
        ring.pop(&mut out);
        // Only 4 bytes of the 6 are free: "CD" is retained.
        assert_eq!(ring.push(b"123456"), 4);
        assert!(ring.unconsume(2));
        let mut all = [0u8; 6];
        assert_eq!(ring.pop(&mut all), 6);
        assert_eq!(&all, b"CD1234");
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut ring = RingBuffer::new(4);
        ring.push(b"xyz");
        let mut out = [0u8; 2];
        assert_eq!(ring.peek(&mut out), 2);
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn test_try_with_history_rejects_bad_geometry() {
        assert!(RingBuffer::try_with_history(4, 4).is_err());
        assert!(RingBuffer::try_with_history(0, 0).is_err());
        let ring = RingBuffer::try_with_history(16, 4).unwrap();
        assert_eq!(ring.capacity(), 16);
        assert_eq!(ring.history(), 4);
    }

    #[test]
    #[should_panic(expected = "greater than history")]
    fn test_zero_capacity_panics() {
        let _ = RingBuffer::new(0);
    }
}
