//! Decompressing input filter.
//!
//! The filter pulls compressed bytes from its upstream producer into a
//! *raw* ring buffer, runs the codec from there into a *plain* ring buffer,
//! and serves reads from the plain ring. Delivered plain bytes stay in the
//! plain ring's history so that [`ByteProducer::putback`] can be served
//! without decompressing again.
//!
//! ```text
//! upstream ──read──▶ [ raw ring ] ──codec──▶ [ plain ring | history ] ──read──▶ caller
//! ```
//!
//! Raw deflate bitstreams may end without enough trailing bits for the codec
//! to notice the final block, so one synthetic zero byte is appended after
//! upstream reports end-of-stream.

use crate::codec::ZlibDecoder;
use medstream_core::config::FilterConfig;
use medstream_core::error::{Result, StickyStatus, StreamError};
use medstream_core::ringbuffer::{RingBuffer, sizes::PUTBACK_WINDOW};
use medstream_core::traits::{ByteProducer, DecompressStatus, Decompressor, InputFilter};

/// Trailing bytes after the logical end that are accepted silently.
const ACCEPTABLE_SLACK: usize = 2;

/// Lifecycle of an input filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// Constructed, no upstream attached yet.
    Init,
    /// Decompressing.
    Streaming,
    /// The codec signalled the logical end of the compressed stream.
    EndOfStream,
    /// A sticky error was recorded.
    Error,
}

/// Progress made by one refill cycle.
#[derive(Debug, Default, Clone, Copy)]
struct Progress {
    pulled: usize,
    consumed: usize,
    produced: usize,
}

impl Progress {
    fn any(&self) -> bool {
        self.pulled > 0 || self.consumed > 0 || self.produced > 0
    }
}

/// A producer that inflates the bytes of its upstream producer.
#[derive(Debug)]
pub struct ZlibInputFilter {
    upstream: Option<Box<dyn ByteProducer>>,
    decoder: ZlibDecoder,
    raw: RingBuffer,
    plain: RingBuffer,
    state: FilterState,
    status: StickyStatus,
    padded: bool,
    slack: Option<u64>,
}

impl ZlibInputFilter {
    /// Create a filter with the process-wide default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(&FilterConfig::global())
    }

    /// Create a filter; the configuration is read once, here.
    pub fn with_config(config: &FilterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            upstream: None,
            decoder: ZlibDecoder::new(config.expect_rfc1950),
            raw: RingBuffer::try_with_history(config.buffer_size, 0)?,
            plain: RingBuffer::try_with_history(
                config.buffer_size + PUTBACK_WINDOW,
                PUTBACK_WINDOW,
            )?,
            state: FilterState::Init,
            status: StickyStatus::new(),
            padded: false,
            slack: None,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> FilterState {
        self.state
    }

    /// Bytes found after the logical end of the compressed stream, counting
    /// those still unread upstream. `None` until the end was reached.
    pub fn trailing_slack(&self) -> Option<u64> {
        self.slack
    }

    fn fail(&mut self, err: StreamError) {
        self.status.fail(err);
        self.state = FilterState::Error;
    }

    /// Usable for reading: good and attached.
    fn ready(&mut self) -> bool {
        if !self.status.good() {
            return false;
        }
        if self.state == FilterState::Init {
            self.fail(StreamError::illegal_call(
                "input filter used before an upstream producer was appended",
            ));
            return false;
        }
        true
    }

    /// Pull compressed bytes from upstream into the raw ring.
    fn fill_raw(&mut self) -> usize {
        let Some(upstream) = self.upstream.as_mut() else {
            return 0;
        };

        let mut pulled = 0;
        let (first, second) = self.raw.writable_mut();
        let n = upstream.read(first);
        pulled += n;
        if n == first.len() && !second.is_empty() {
            pulled += upstream.read(second);
        }
        self.raw.commit(pulled);

        if let Err(err) = upstream.status() {
            self.fail(err);
            return pulled;
        }

        if upstream.eos() && !self.padded && !self.raw.is_full() {
            self.raw.push(&[0]);
            self.padded = true;
            pulled += 1;
        }
        pulled
    }

    /// Run the codec from the raw ring into the plain ring.
    fn inflate(&mut self) -> (usize, usize) {
        let mut consumed = 0;
        let mut produced = 0;

        while self.state == FilterState::Streaming {
            let input = self.raw.readable().0;
            let output = self.plain.writable_mut().0;
            if output.is_empty() {
                break;
            }

            let result = self.decoder.decompress(input, output);
            match result {
                Ok((c, p, status)) => {
                    self.raw.consume(c);
                    self.plain.commit(p);
                    consumed += c;
                    produced += p;

                    if status == DecompressStatus::Done {
                        self.state = FilterState::EndOfStream;
                        self.check_slack();
                        break;
                    }
                    if c == 0 && p == 0 {
                        break;
                    }
                }
                Err(err) => {
                    self.fail(err);
                    break;
                }
            }
        }

        (consumed, produced)
    }

    fn check_slack(&mut self) {
        let pending = self.upstream.as_mut().map_or(0, |up| up.avail());
        let slack = (self.raw.len() as u64)
            .saturating_add(pending)
            .saturating_sub(u64::from(self.padded));
        self.slack = Some(slack);
        if slack > ACCEPTABLE_SLACK as u64 {
            tracing::warn!(
                slack,
                "ignoring trailing bytes after the end of the compressed stream"
            );
        } else {
            tracing::trace!(slack, "compressed stream complete");
        }
    }

    /// Refill the plain ring until it gains bytes or nothing moves.
    fn refill(&mut self) -> usize {
        let mut total = 0;
        while self.state == FilterState::Streaming {
            let mut progress = Progress::default();
            if !self.raw.is_full() {
                progress.pulled = self.fill_raw();
            }
            let (consumed, produced) = self.inflate();
            progress.consumed = consumed;
            progress.produced = produced;
            total += produced;

            tracing::trace!(?progress, "zlib input refill");

            if produced > 0 || !progress.any() {
                if !progress.any() {
                    self.check_truncation();
                }
                break;
            }
        }
        total
    }

    /// Upstream exhausted, padding consumed, codec stuck: the compressed
    /// stream was cut short.
    fn check_truncation(&mut self) {
        if self.state != FilterState::Streaming || !self.plain.is_empty() {
            return;
        }
        let exhausted = self.upstream.as_ref().is_some_and(|up| up.eos());
        if exhausted && self.padded {
            self.fail(StreamError::codec("compressed stream truncated"));
        }
    }
}

impl ByteProducer for ZlibInputFilter {
    fn status(&self) -> Result<()> {
        self.status.check()
    }

    fn eos(&self) -> bool {
        self.status.good() && self.state == FilterState::EndOfStream && self.plain.is_empty()
    }

    fn avail(&mut self) -> u64 {
        if !self.ready() {
            return 0;
        }
        if self.plain.is_empty() {
            self.refill();
        }
        self.plain.len() as u64
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        if !self.ready() {
            return 0;
        }

        let mut total = 0;
        while total < buf.len() {
            if self.plain.is_empty() && self.refill() == 0 {
                break;
            }
            total += self.plain.pop(&mut buf[total..]);
        }
        total
    }

    fn skip(&mut self, n: u64) -> u64 {
        if !self.ready() {
            return 0;
        }

        let mut skipped = 0u64;
        loop {
            if self.plain.is_empty() && self.refill() == 0 {
                break;
            }
            if skipped == n {
                break;
            }
            let step = (self.plain.len() as u64).min(n - skipped);
            self.plain.consume(step as usize);
            skipped += step;
        }
        skipped
    }

    fn putback(&mut self, n: u64) {
        if !self.ready() || n == 0 {
            return;
        }
        let retained = self.plain.retained() as u64;
        if n > retained || !self.plain.unconsume(n as usize) {
            self.fail(StreamError::putback_failed(n, retained));
        }
    }
}

impl InputFilter for ZlibInputFilter {
    fn append(&mut self, upstream: Box<dyn ByteProducer>) -> Result<()> {
        if self.upstream.is_some() {
            return Err(StreamError::illegal_call(
                "input filter already has an upstream producer",
            ));
        }
        self.upstream = Some(upstream);
        if self.state == FilterState::Init {
            self.state = FilterState::Streaming;
        }
        Ok(())
    }
}
