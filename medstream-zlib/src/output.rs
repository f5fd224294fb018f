//! Compressing output filter.
//!
//! Written bytes are buffered in an *input* ring, deflated into an *output*
//! ring, and handed to the downstream consumer as it accepts them. The
//! produced bitstream is always raw deflate.
//!
//! [`ByteConsumer::flush`] finalizes the compressed stream: after the first
//! flush the filter accepts no further writes, and repeated flushes only
//! drive the remaining output downstream.

use crate::codec::ZlibEncoder;
use medstream_core::config::FilterConfig;
use medstream_core::error::{Result, StickyStatus, StreamError};
use medstream_core::ringbuffer::RingBuffer;
use medstream_core::traits::{
    ByteConsumer, CompressStatus, Compressor, FlushMode, OutputFilter,
};

/// Lifecycle of an output filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    /// Constructed, no downstream attached yet.
    Init,
    /// Accepting writes.
    Streaming,
    /// Flush requested; the end of the compressed stream is being emitted.
    Finishing,
    /// The codec emitted the end of the compressed stream.
    Finished,
}

/// A consumer that deflates bytes before passing them downstream.
#[derive(Debug)]
pub struct ZlibOutputFilter {
    downstream: Option<Box<dyn ByteConsumer>>,
    encoder: ZlibEncoder,
    input: RingBuffer,
    output: RingBuffer,
    state: OutputState,
    status: StickyStatus,
}

impl ZlibOutputFilter {
    /// Create a filter with the process-wide default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(&FilterConfig::global())
    }

    /// Create a filter; the configuration is read once, here.
    pub fn with_config(config: &FilterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            downstream: None,
            encoder: ZlibEncoder::new(config.level, false),
            input: RingBuffer::try_with_history(config.buffer_size, 0)?,
            output: RingBuffer::try_with_history(config.buffer_size, 0)?,
            state: OutputState::Init,
            status: StickyStatus::new(),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> OutputState {
        self.state
    }

    /// Plain bytes accepted so far.
    pub fn total_in(&self) -> u64 {
        self.encoder.total_in()
    }

    /// Compressed bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.encoder.total_out()
    }

    fn ready(&mut self) -> bool {
        if !self.status.good() {
            return false;
        }
        if self.state == OutputState::Init {
            self.status.fail(StreamError::illegal_call(
                "output filter used before a downstream consumer was appended",
            ));
            return false;
        }
        true
    }

    /// Run the codec from the input ring into the output ring. Returns the
    /// number of bytes moved on either side.
    fn deflate(&mut self, finish: bool) -> usize {
        let mut moved = 0;

        while matches!(self.state, OutputState::Streaming | OutputState::Finishing) {
            let (first, second) = self.input.readable();
            let mode = if finish && second.is_empty() {
                FlushMode::Finish
            } else {
                FlushMode::None
            };
            if first.is_empty() && mode == FlushMode::None {
                break;
            }
            let output = self.output.writable_mut().0;
            if output.is_empty() {
                break;
            }

            match self.encoder.compress(first, output, mode) {
                Ok((consumed, produced, status)) => {
                    self.input.consume(consumed);
                    self.output.commit(produced);
                    moved += consumed + produced;

                    if status == CompressStatus::Done {
                        tracing::trace!(
                            total_in = self.encoder.total_in(),
                            total_out = self.encoder.total_out(),
                            "compressed stream finished"
                        );
                        self.state = OutputState::Finished;
                        break;
                    }
                    if consumed == 0 && produced == 0 {
                        break;
                    }
                }
                Err(err) => {
                    self.status.fail(err);
                    break;
                }
            }
        }

        moved
    }

    /// Hand buffered compressed bytes to the downstream consumer.
    fn drain(&mut self) -> usize {
        let Some(downstream) = self.downstream.as_mut() else {
            return 0;
        };

        let mut drained = 0;
        loop {
            let run = self.output.readable().0;
            let len = run.len();
            if len == 0 {
                break;
            }
            let n = downstream.write(run);
            self.output.consume(n);
            drained += n;
            if n < len {
                break;
            }
        }

        if let Err(err) = downstream.status() {
            self.status.fail(err);
        }
        drained
    }
}

impl ByteConsumer for ZlibOutputFilter {
    fn status(&self) -> Result<()> {
        self.status.check()
    }

    fn is_flushed(&self) -> bool {
        self.state == OutputState::Finished
            && self.input.is_empty()
            && self.output.is_empty()
            && self.downstream.as_ref().is_some_and(|d| d.is_flushed())
    }

    fn avail(&self) -> u64 {
        if !self.status.good() || self.state != OutputState::Streaming {
            return 0;
        }
        self.input.free() as u64
    }

    fn write(&mut self, buf: &[u8]) -> usize {
        if !self.ready() {
            return 0;
        }
        if self.state != OutputState::Streaming {
            self.status.fail(StreamError::illegal_call(
                "write after the compressed stream was finalized",
            ));
            return 0;
        }

        let mut taken = 0;
        loop {
            taken += self.input.push(&buf[taken..]);
            let moved = self.deflate(false);
            let drained = self.drain();
            if !self.status.good() || taken == buf.len() {
                break;
            }
            if moved == 0 && drained == 0 && self.input.is_full() {
                break;
            }
        }
        taken
    }

    fn flush(&mut self) {
        if !self.ready() {
            return;
        }
        if self.state == OutputState::Streaming {
            self.state = OutputState::Finishing;
        }

        loop {
            let moved = self.deflate(true);
            let drained = self.drain();
            if !self.status.good() {
                return;
            }
            if self.state == OutputState::Finished && self.output.is_empty() {
                break;
            }
            if moved == 0 && drained == 0 {
                break;
            }
        }

        if let Some(downstream) = self.downstream.as_mut() {
            downstream.flush();
            if let Err(err) = downstream.status() {
                self.status.fail(err);
            }
        }
    }
}

impl OutputFilter for ZlibOutputFilter {
    fn append(&mut self, downstream: Box<dyn ByteConsumer>) -> Result<()> {
        if self.downstream.is_some() {
            return Err(StreamError::illegal_call(
                "output filter already has a downstream consumer",
            ));
        }
        self.downstream = Some(downstream);
        if self.state == OutputState::Init {
            self.state = OutputState::Streaming;
        }
        Ok(())
    }
}
