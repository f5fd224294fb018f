//! In-memory terminal adapters.
//!
//! [`MemoryProducer`] serves either a complete value or, through
//! [`MemoryProducer::channel`], bytes that arrive incrementally (for
//! example PDV fragments received from a network association). While
//! starved it suspends instead of reporting end-of-stream. A complete value
//! is held as a shared `Rc<[u8]>`, so several producers over the same value
//! never copy it.
//!
//! [`MemoryConsumer`] collects written bytes behind a [`MemorySink`] handle.
//! The bounded form suspends when its capacity is reached and counts as
//! flushed only once the sink has been drained.
//!
//! Both sides share state through `Rc<RefCell<_>>`: these adapters belong
//! to a single call stack.

use crate::error::{Result, StickyStatus, StreamError};
use crate::ringbuffer::sizes::PUTBACK_WINDOW;
use crate::traits::{ByteConsumer, ByteProducer};
use std::cell::RefCell;
use std::rc::Rc;

/// Delivered bytes are discarded once this many accumulate, keeping the
/// putback window.
const COMPACT_THRESHOLD: usize = 4 * PUTBACK_WINDOW;

#[derive(Debug, Default)]
struct Source {
    data: Vec<u8>,
    position: usize,
    closed: bool,
}

impl Source {
    fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    fn compact(&mut self) {
        if self.position > COMPACT_THRESHOLD {
            let drop = self.position - PUTBACK_WINDOW;
            self.data.drain(..drop);
            self.position -= drop;
        }
    }
}

/// Where a [`MemoryProducer`] takes its bytes from.
#[derive(Debug)]
enum Backing {
    /// Complete value; `start` is the first byte this producer may deliver
    /// or put back to.
    Shared {
        data: Rc<[u8]>,
        start: usize,
        position: usize,
    },
    Channel(Rc<RefCell<Source>>),
}

/// A producer over bytes held in memory.
#[derive(Debug)]
pub struct MemoryProducer {
    backing: Backing,
    status: StickyStatus,
    max_read: usize,
}

impl MemoryProducer {
    /// Serve a complete value; end-of-stream follows the last byte.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self::from_shared(Rc::from(data.into()), 0)
    }

    /// Serve `data` from `offset` on without copying it. Offsets past the
    /// end give an empty producer.
    pub fn from_shared(data: Rc<[u8]>, offset: usize) -> Self {
        let start = offset.min(data.len());
        Self {
            backing: Backing::Shared {
                data,
                start,
                position: start,
            },
            status: StickyStatus::new(),
            max_read: usize::MAX,
        }
    }

    /// Create a producer fed incrementally through the returned handle.
    pub fn channel() -> (Self, MemoryFeed) {
        let source = Rc::new(RefCell::new(Source::default()));
        let producer = Self {
            backing: Backing::Channel(Rc::clone(&source)),
            status: StickyStatus::new(),
            max_read: usize::MAX,
        };
        (producer, MemoryFeed { source })
    }

    /// Deliver at most `max_read` bytes per call.
    pub fn with_max_read(mut self, max_read: usize) -> Self {
        self.max_read = max_read.max(1);
        self
    }

    /// Number of delivered bytes still held for putback.
    pub fn retained(&self) -> usize {
        match &self.backing {
            Backing::Shared {
                start, position, ..
            } => position - start,
            Backing::Channel(source) => source.borrow().position,
        }
    }

    fn remaining(&self) -> usize {
        match &self.backing {
            Backing::Shared { data, position, .. } => data.len() - position,
            Backing::Channel(source) => source.borrow().remaining(),
        }
    }

    /// Move the read position by `delta` bytes; callers check the bounds.
    fn advance(&mut self, delta: usize) {
        match &mut self.backing {
            Backing::Shared { position, .. } => *position += delta,
            Backing::Channel(source) => source.borrow_mut().position += delta,
        }
    }
}

impl ByteProducer for MemoryProducer {
    fn status(&self) -> Result<()> {
        self.status.check()
    }

    fn eos(&self) -> bool {
        match &self.backing {
            Backing::Shared { data, position, .. } => *position == data.len(),
            Backing::Channel(source) => {
                let source = source.borrow();
                source.closed && source.remaining() == 0
            }
        }
    }

    fn avail(&mut self) -> u64 {
        if !self.status.good() {
            return 0;
        }
        self.remaining().min(self.max_read) as u64
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        if !self.status.good() {
            return 0;
        }
        let n = self.remaining().min(buf.len()).min(self.max_read);
        match &self.backing {
            Backing::Shared { data, position, .. } => {
                buf[..n].copy_from_slice(&data[*position..*position + n]);
            }
            Backing::Channel(source) => {
                let source = source.borrow();
                let start = source.position;
                buf[..n].copy_from_slice(&source.data[start..start + n]);
            }
        }
        self.advance(n);
        n
    }

    fn skip(&mut self, n: u64) -> u64 {
        if !self.status.good() {
            return 0;
        }
        let step = (self.remaining().min(self.max_read) as u64).min(n);
        self.advance(step as usize);
        step
    }

    fn putback(&mut self, n: u64) {
        if !self.status.good() {
            return;
        }
        let available = self.retained() as u64;
        if n > available {
            self.status.fail(StreamError::putback_failed(n, available));
            return;
        }
        match &mut self.backing {
            Backing::Shared { position, .. } => *position -= n as usize,
            Backing::Channel(source) => source.borrow_mut().position -= n as usize,
        }
    }
}

/// Feeding handle of a channel [`MemoryProducer`].
#[derive(Debug)]
pub struct MemoryFeed {
    source: Rc<RefCell<Source>>,
}

impl MemoryFeed {
    /// Append bytes for the producer to deliver.
    pub fn push(&self, data: &[u8]) -> Result<()> {
        let mut source = self.source.borrow_mut();
        if source.closed {
            return Err(StreamError::illegal_call("push after the feed was closed"));
        }
        source.compact();
        source.data.extend_from_slice(data);
        Ok(())
    }

    /// Signal that no further bytes will be pushed.
    pub fn close(&self) {
        self.source.borrow_mut().closed = true;
    }

    /// Number of pushed bytes the producer has not delivered yet.
    pub fn pending(&self) -> usize {
        self.source.borrow().remaining()
    }
}

#[derive(Debug, Default)]
struct Target {
    data: Vec<u8>,
    limit: Option<usize>,
}

/// A consumer that collects bytes in memory.
#[derive(Debug)]
pub struct MemoryConsumer {
    target: Rc<RefCell<Target>>,
    status: StickyStatus,
}

impl MemoryConsumer {
    /// Collect everything written; never suspends.
    pub fn unbounded() -> (Self, MemorySink) {
        Self::with_limit(None)
    }

    /// Accept at most `capacity` undrained bytes; suspends when full.
    pub fn bounded(capacity: usize) -> (Self, MemorySink) {
        Self::with_limit(Some(capacity))
    }

    fn with_limit(limit: Option<usize>) -> (Self, MemorySink) {
        let target = Rc::new(RefCell::new(Target {
            data: Vec::new(),
            limit,
        }));
        let consumer = Self {
            target: Rc::clone(&target),
            status: StickyStatus::new(),
        };
        (consumer, MemorySink { target })
    }
}

impl ByteConsumer for MemoryConsumer {
    fn status(&self) -> Result<()> {
        self.status.check()
    }

    fn is_flushed(&self) -> bool {
        let target = self.target.borrow();
        target.limit.is_none() || target.data.is_empty()
    }

    fn avail(&self) -> u64 {
        if !self.status.good() {
            return 0;
        }
        let target = self.target.borrow();
        match target.limit {
            Some(limit) => limit.saturating_sub(target.data.len()) as u64,
            None => u64::MAX,
        }
    }

    fn write(&mut self, buf: &[u8]) -> usize {
        if !self.status.good() {
            return 0;
        }
        let mut target = self.target.borrow_mut();
        let room = match target.limit {
            Some(limit) => limit.saturating_sub(target.data.len()),
            None => usize::MAX,
        };
        let n = room.min(buf.len());
        target.data.extend_from_slice(&buf[..n]);
        n
    }

    fn flush(&mut self) {}
}

/// Draining handle of a [`MemoryConsumer`].
#[derive(Debug)]
pub struct MemorySink {
    target: Rc<RefCell<Target>>,
}

impl MemorySink {
    /// Remove and return everything written so far.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut self.target.borrow_mut().data)
    }

    /// Copy of everything written so far.
    pub fn to_vec(&self) -> Vec<u8> {
        self.target.borrow().data.clone()
    }

    /// Number of undrained bytes.
    pub fn len(&self) -> usize {
        self.target.borrow().data.len()
    }

    /// `true` when nothing is waiting to be drained.
    pub fn is_empty(&self) -> bool {
        self.target.borrow().data.is_empty()
    }
}
