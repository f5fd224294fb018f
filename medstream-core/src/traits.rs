//! Core traits for byte producers, byte consumers, filters and codecs.
//!
//! A chain is built from one terminal adapter (file, memory, standard
//! output) and at most a handful of filters. Every operation follows the
//! same partial-progress contract: returning fewer bytes than requested is
//! *suspension*, not failure. Failures are reported through the sticky
//! status returned by `status()`.

use crate::error::{Result, StreamError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a streaming decompression operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressStatus {
    /// More input is needed to continue decompression.
    NeedsInput,
    /// More output buffer space is needed.
    NeedsOutput,
    /// The codec reached the logical end of the compressed stream.
    Done,
}

/// Status of a streaming compression operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressStatus {
    /// More input data can be accepted.
    NeedsInput,
    /// More output buffer space is needed.
    NeedsOutput,
    /// Compression is complete.
    Done,
}

/// Flush mode for compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// No flush - buffer data for best compression.
    #[default]
    None,
    /// Sync flush - emit all pending output.
    Sync,
    /// Full flush - emit and reset encoder state.
    Full,
    /// Finish - complete the stream.
    Finish,
}

/// A streaming decompressor (decoder).
///
/// Implemented by the codec adapters that sit inside an input filter. It
/// never blocks: it consumes what it can from `input` and produces what fits
/// into `output`.
pub trait Decompressor {
    /// Decompress data from input to output.
    ///
    /// # Returns
    ///
    /// A tuple of (bytes consumed from input, bytes written to output, status)
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)>;

    /// Reset the decompressor to its initial state.
    fn reset(&mut self);

    /// Check if the decompressor has reached the logical end of its stream.
    fn is_finished(&self) -> bool;

    /// Decompress a complete buffer at once (convenience method).
    fn decompress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut input_pos = 0;
        let mut buffer = vec![0u8; 32768];

        loop {
            let (consumed, produced, status) = self.decompress(&input[input_pos..], &mut buffer)?;

            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            match status {
                DecompressStatus::Done => break,
                _ if consumed == 0 && produced == 0 => {
                    return Err(StreamError::codec(
                        "compressed input ended before the end of the stream",
                    ));
                }
                _ => continue,
            }
        }

        Ok(output)
    }
}

/// A streaming compressor (encoder).
pub trait Compressor {
    /// Compress data from input to output.
    ///
    /// # Returns
    ///
    /// A tuple of (bytes consumed from input, bytes written to output, status)
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)>;

    /// Reset the compressor to its initial state.
    fn reset(&mut self);

    /// Check if the compressor has finished.
    fn is_finished(&self) -> bool;

    /// Compress a complete buffer at once (convenience method).
    fn compress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut input_pos = 0;
        let mut buffer = vec![0u8; 32768];

        loop {
            let (consumed, produced, status) =
                self.compress(&input[input_pos..], &mut buffer, FlushMode::Finish)?;

            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            if status == CompressStatus::Done {
                break;
            }
            if consumed == 0 && produced == 0 {
                return Err(StreamError::codec("compressor made no progress"));
            }
        }

        Ok(output)
    }
}

/// A source of an ordered byte sequence of known or unknown length.
pub trait ByteProducer {
    /// `Ok(())` while the producer is usable, otherwise its sticky error.
    fn status(&self) -> Result<()>;

    /// `true` while no error has been recorded.
    fn good(&self) -> bool {
        self.status().is_ok()
    }

    /// `true` only when no more bytes will ever be produced.
    fn eos(&self) -> bool;

    /// Lower bound on the bytes the next [`read`](Self::read) can deliver
    /// without suspension. May prime internal buffers.
    fn avail(&mut self) -> u64;

    /// Copy up to `buf.len()` bytes into `buf`.
    ///
    /// A short count is suspension; call again to resume.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Skip up to `n` bytes, with the same partial-progress contract as
    /// [`read`](Self::read).
    fn skip(&mut self, n: u64) -> u64;

    /// Un-deliver the last `n` bytes. Failing sets
    /// [`StreamError::PutbackFailed`].
    fn putback(&mut self, n: u64);
}

/// A sink for an ordered byte sequence.
pub trait ByteConsumer {
    /// `Ok(())` while the consumer is usable, otherwise its sticky error.
    fn status(&self) -> Result<()>;

    /// `true` while no error has been recorded.
    fn good(&self) -> bool {
        self.status().is_ok()
    }

    /// `true` when no buffered bytes remain undelivered.
    fn is_flushed(&self) -> bool;

    /// Number of bytes the next [`write`](Self::write) accepts without
    /// suspension.
    fn avail(&self) -> u64;

    /// Accept up to `buf.len()` bytes; a short count is suspension.
    fn write(&mut self, buf: &[u8]) -> usize;

    /// Drive buffered bytes towards the final destination. May suspend;
    /// repeated calls are safe.
    fn flush(&mut self);
}

impl fmt::Debug for dyn ByteProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteProducer")
            .field("good", &self.good())
            .field("eos", &self.eos())
            .finish()
    }
}

impl fmt::Debug for dyn ByteConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteConsumer")
            .field("good", &self.good())
            .field("flushed", &self.is_flushed())
            .finish()
    }
}

/// A producer that transforms the bytes of exactly one upstream producer.
pub trait InputFilter: ByteProducer {
    /// Attach the upstream producer. Allowed exactly once; a second call is
    /// [`StreamError::IllegalCall`].
    fn append(&mut self, upstream: Box<dyn ByteProducer>) -> Result<()>;
}

/// A consumer that transforms bytes before handing them to exactly one
/// downstream consumer.
pub trait OutputFilter: ByteConsumer {
    /// Attach the downstream consumer. Allowed exactly once; a second call
    /// is [`StreamError::IllegalCall`].
    fn append(&mut self, downstream: Box<dyn ByteConsumer>) -> Result<()>;
}

/// Compression applied to a stream as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamCompression {
    /// Bytes are stored as-is.
    None,
    /// A compression scheme this library cannot process.
    Unsupported,
    /// Deflate, optionally with a zlib (RFC 1950) wrapper.
    Zlib,
}

impl fmt::Display for StreamCompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Unsupported => f.write_str("unsupported"),
            Self::Zlib => f.write_str("zlib"),
        }
    }
}

/// Compression level for algorithms that support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    /// No compression (store only).
    pub const NONE: Self = Self(0);
    /// Fastest compression.
    pub const FAST: Self = Self(1);
    /// Default compression (balanced).
    pub const DEFAULT: Self = Self(6);
    /// Best compression (slowest).
    pub const BEST: Self = Self(9);

    /// Create a custom compression level (0-9).
    pub fn new(level: u8) -> Self {
        Self(level.min(9))
    }

    /// Get the level value.
    pub fn level(&self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u8> for CompressionLevel {
    fn from(level: u8) -> Self {
        Self::new(level)
    }
}

impl From<CompressionLevel> for u8 {
    fn from(level: CompressionLevel) -> Self {
        level.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_level() {
        assert_eq!(CompressionLevel::NONE.level(), 0);
        assert_eq!(CompressionLevel::FAST.level(), 1);
        assert_eq!(CompressionLevel::DEFAULT.level(), 6);
        assert_eq!(CompressionLevel::BEST.level(), 9);

        // Test clamping
        assert_eq!(CompressionLevel::new(100).level(), 9);
    }

    #[test]
    fn test_flush_mode_default() {
        assert_eq!(FlushMode::default(), FlushMode::None);
    }

    #[test]
    fn test_stream_compression_display() {
        assert_eq!(StreamCompression::Zlib.to_string(), "zlib");
        assert_eq!(StreamCompression::None.to_string(), "none");
    }

    #[test]
    fn test_compression_level_serde_clamps() {
        let level: CompressionLevel = serde_json::from_str("42").unwrap();
        assert_eq!(level, CompressionLevel::BEST);
        assert_eq!(serde_json::to_string(&CompressionLevel::FAST).unwrap(), "1");
    }

    struct Passthrough {
        finished: bool,
    }

    impl Decompressor for Passthrough {
        fn decompress(
            &mut self,
            input: &[u8],
            output: &mut [u8],
        ) -> Result<(usize, usize, DecompressStatus)> {
            let n = input.len().min(output.len());
            output[..n].copy_from_slice(&input[..n]);
            if n == input.len() {
                self.finished = true;
                Ok((n, n, DecompressStatus::Done))
            } else {
                Ok((n, n, DecompressStatus::NeedsOutput))
            }
        }

        fn reset(&mut self) {
            self.finished = false;
        }

        fn is_finished(&self) -> bool {
            self.finished
        }
    }

    #[test]
    fn test_decompress_all_loops_over_output_buffer() {
        let data: Vec<u8> = (0..100_000).map(|i| (i % 251) as u8).collect();
        let mut codec = Passthrough { finished: false };
        let out = codec.decompress_all(&data).unwrap();
        assert_eq!(out, data);
        assert!(codec.is_finished());
    }
}
