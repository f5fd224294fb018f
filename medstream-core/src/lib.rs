//! # medstream Core
//!
//! Core components for the medstream streaming I/O engine.
//!
//! This crate provides the fundamental building blocks of a filter chain:
//!
//! - [`traits`]: Byte producer/consumer contracts, filter and codec traits
//! - [`ringbuffer`]: Fixed-capacity circular buffer with putback history
//! - [`memory`]: In-memory terminal adapters
//! - [`config`]: Filter configuration and its process-wide default
//! - [`error`]: Error types and sticky status
//!
//! ## Architecture
//!
//! medstream is designed as a layered stack:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Access                                              │
//! │     Read cache, write cache, partial value access      │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Stream                                              │
//! │     InputStream / OutputStream, factories, tell/mark   │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Filter                                              │
//! │     zlib input/output filters over two ring buffers    │
//! ├─────────────────────────────────────────────────────────┤
//! │ L0: Terminal (this crate + medstream-io)                │
//! │     Memory, file, mapped file, standard output         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use medstream_core::memory::MemoryProducer;
//! use medstream_core::traits::ByteProducer;
//!
//! let mut producer = MemoryProducer::new(b"DICM".to_vec());
//! let mut magic = [0u8; 4];
//! assert_eq!(producer.read(&mut magic), 4);
//! assert!(producer.eos());
//!
//! // Un-deliver the preamble so another parser can try.
//! producer.putback(4);
//! assert!(producer.good());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod memory;
pub mod ringbuffer;
pub mod traits;

// Re-exports for convenience
pub use config::FilterConfig;
pub use error::{Result, StickyStatus, StreamError};
pub use memory::{MemoryConsumer, MemoryFeed, MemoryProducer, MemorySink};
pub use ringbuffer::RingBuffer;
pub use traits::{
    ByteConsumer, ByteProducer, CompressStatus, CompressionLevel, Compressor, DecompressStatus,
    Decompressor, FlushMode, InputFilter, OutputFilter, StreamCompression,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::FilterConfig;
    pub use crate::error::{Result, StreamError};
    pub use crate::memory::{MemoryConsumer, MemoryProducer};
    pub use crate::ringbuffer::RingBuffer;
    pub use crate::traits::{
        ByteConsumer, ByteProducer, CompressionLevel, InputFilter, OutputFilter,
        StreamCompression,
    };
}
