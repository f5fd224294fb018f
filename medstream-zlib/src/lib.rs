//! # medstream zlib
//!
//! Suspending deflate/zlib filters for medstream chains.
//!
//! This crate provides the compression layer of a filter chain, which is
//! what the deflated transfer syntax needs on both the read and the write
//! side.
//!
//! ## Features
//!
//! - **Input filter**: [`ZlibInputFilter`] inflates its upstream producer
//!   - Raw deflate (RFC 1951) or zlib (RFC 1950), chosen by configuration
//!   - 1 KB putback window over the decompressed bytes
//!   - Tolerates a little trailing slack after the logical end
//! - **Output filter**: [`ZlibOutputFilter`] deflates into its downstream
//!   consumer
//!   - Always emits raw deflate
//!   - Levels 0-9, taken from the configuration at construction
//! - **Codec adapters**: [`ZlibDecoder`] / [`ZlibEncoder`] for one-shot use
//!
//! ## Example
//!
//! ```rust
//! use medstream_core::prelude::*;
//! use medstream_zlib::{ZlibInputFilter, ZlibOutputFilter};
//!
//! let data = b"(0002,0010) Deflated Explicit VR Little Endian".repeat(50);
//!
//! // Compress into memory
//! let (consumer, sink) = MemoryConsumer::unbounded();
//! let mut deflater = ZlibOutputFilter::new().unwrap();
//! deflater.append(Box::new(consumer)).unwrap();
//! assert_eq!(deflater.write(&data), data.len());
//! deflater.flush();
//! assert!(deflater.is_flushed());
//!
//! // Decompress it again
//! let mut inflater = ZlibInputFilter::new().unwrap();
//! inflater.append(Box::new(MemoryProducer::new(sink.take()))).unwrap();
//! let mut plain = vec![0u8; data.len()];
//! let mut got = 0;
//! while got < plain.len() {
//!     let n = inflater.read(&mut plain[got..]);
//!     assert!(n > 0);
//!     got += n;
//! }
//! assert_eq!(plain, data);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod input;
pub mod output;

// Re-exports
pub use codec::{ZlibDecoder, ZlibEncoder, compress_to_vec, decompress_to_vec};
pub use input::{FilterState, ZlibInputFilter};
pub use output::{OutputState, ZlibOutputFilter};
