//! zlib codec adapters.
//!
//! [`ZlibDecoder`] and [`ZlibEncoder`] wrap `flate2`'s low-level
//! [`Decompress`] and [`Compress`] state machines behind the
//! [`Decompressor`] / [`Compressor`] traits. Neither ever blocks: each call
//! consumes what it can and produces what fits.
//!
//! # Formats
//!
//! - Raw deflate (RFC 1951): bare bitstream, as used by the deflated
//!   transfer syntax.
//! - zlib (RFC 1950): two header bytes, the deflate bitstream, and an
//!   Adler-32 trailer.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use medstream_core::error::{Result, StreamError};
use medstream_core::traits::{
    CompressStatus, CompressionLevel, Compressor, DecompressStatus, Decompressor, FlushMode,
};

/// Streaming deflate/zlib decoder.
#[derive(Debug)]
pub struct ZlibDecoder {
    inner: Decompress,
    zlib_header: bool,
    finished: bool,
}

impl ZlibDecoder {
    /// Create a decoder; `zlib_header` selects RFC 1950 over raw deflate.
    pub fn new(zlib_header: bool) -> Self {
        Self {
            inner: Decompress::new(zlib_header),
            zlib_header,
            finished: false,
        }
    }

    /// Total compressed bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.inner.total_in()
    }

    /// Total plain bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.inner.total_out()
    }
}

impl Decompressor for ZlibDecoder {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        if self.finished {
            return Ok((0, 0, DecompressStatus::Done));
        }

        let before_in = self.inner.total_in();
        let before_out = self.inner.total_out();
        let status = self
            .inner
            .decompress(input, output, FlushDecompress::None)
            .map_err(|e| StreamError::codec(e.to_string()))?;
        let consumed = (self.inner.total_in() - before_in) as usize;
        let produced = (self.inner.total_out() - before_out) as usize;

        let status = match status {
            Status::StreamEnd => {
                self.finished = true;
                DecompressStatus::Done
            }
            // BufError only means no progress was possible with these buffers.
            Status::Ok | Status::BufError => {
                if !output.is_empty() && produced == output.len() {
                    DecompressStatus::NeedsOutput
                } else {
                    DecompressStatus::NeedsInput
                }
            }
        };

        Ok((consumed, produced, status))
    }

    fn reset(&mut self) {
        self.inner.reset(self.zlib_header);
        self.finished = false;
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Streaming deflate/zlib encoder.
#[derive(Debug)]
pub struct ZlibEncoder {
    inner: Compress,
    finished: bool,
}

impl ZlibEncoder {
    /// Create an encoder; `zlib_header` selects RFC 1950 over raw deflate.
    pub fn new(level: CompressionLevel, zlib_header: bool) -> Self {
        Self {
            inner: Compress::new(Compression::new(u32::from(level.level())), zlib_header),
            finished: false,
        }
    }

    /// Total plain bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.inner.total_in()
    }

    /// Total compressed bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.inner.total_out()
    }
}

impl Compressor for ZlibEncoder {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        if self.finished {
            return Ok((0, 0, CompressStatus::Done));
        }

        let flush = match flush {
            FlushMode::None => FlushCompress::None,
            FlushMode::Sync => FlushCompress::Sync,
            FlushMode::Full => FlushCompress::Full,
            FlushMode::Finish => FlushCompress::Finish,
        };

        let before_in = self.inner.total_in();
        let before_out = self.inner.total_out();
        let status = self
            .inner
            .compress(input, output, flush)
            .map_err(|e| StreamError::codec(e.to_string()))?;
        let consumed = (self.inner.total_in() - before_in) as usize;
        let produced = (self.inner.total_out() - before_out) as usize;

        let status = match status {
            Status::StreamEnd => {
                self.finished = true;
                CompressStatus::Done
            }
            Status::Ok | Status::BufError => {
                if !output.is_empty() && produced == output.len() {
                    CompressStatus::NeedsOutput
                } else {
                    CompressStatus::NeedsInput
                }
            }
        };

        Ok((consumed, produced, status))
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.finished = false;
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Compress a complete buffer as raw deflate or zlib.
///
/// # Example
///
/// ```
/// use medstream_core::CompressionLevel;
/// use medstream_zlib::codec::{compress_to_vec, decompress_to_vec};
///
/// let data = b"Hello, World! Hello, World!";
/// let compressed = compress_to_vec(data, CompressionLevel::DEFAULT, false).unwrap();
/// let decompressed = decompress_to_vec(&compressed, false).unwrap();
/// assert_eq!(decompressed, data);
/// ```
pub fn compress_to_vec(input: &[u8], level: CompressionLevel, zlib_header: bool) -> Result<Vec<u8>> {
    ZlibEncoder::new(level, zlib_header).compress_all(input)
}

/// Decompress a complete raw deflate or zlib buffer.
pub fn decompress_to_vec(input: &[u8], zlib_header: bool) -> Result<Vec<u8>> {
    ZlibDecoder::new(zlib_header).decompress_all(input)
}
