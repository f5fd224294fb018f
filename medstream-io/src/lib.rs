//! # medstream IO
//!
//! Streams, terminal adapters and value caches on top of the medstream
//! filter chain.
//!
//! - [`file`]: file and standard-output terminals
//! - [`stream`]: [`InputStream`] / [`OutputStream`] with `tell`, mark/putback
//!   and one optional compression filter
//! - [`factory`]: reopen a stream at a remembered position
//! - [`temp`]: reference-counted temporary files
//! - [`value`]: partial access to element values
//! - [`cache`] / [`wcache`]: read cache and 64 KiB write cache
//! - `mmap` (feature `mmap`): memory-mapped file producer
//!
//! ## Example
//!
//! ```rust
//! use medstream_core::StreamCompression;
//! use medstream_io::{InputStream, OutputStream};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("deflated.bin");
//!
//! let mut out = OutputStream::create(&path).unwrap();
//! out.install_compression_filter(StreamCompression::Zlib).unwrap();
//! out.write(b"pixel data pixel data pixel data").unwrap();
//! out.flush().unwrap();
//! drop(out);
//!
//! let mut input = InputStream::open(&path, 0).unwrap();
//! input.install_compression_filter(StreamCompression::Zlib).unwrap();
//! let mut buf = [0u8; 10];
//! input.read_fully(&mut buf).unwrap();
//! assert_eq!(&buf, b"pixel data");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod factory;
pub mod file;
#[cfg(feature = "mmap")]
pub mod mmap;
pub mod stream;
pub mod temp;
pub mod value;
pub mod wcache;

// Re-exports
pub use cache::ReadCache;
pub use factory::{FileStreamFactory, InputStreamFactory, MemoryStreamFactory, TempFileStreamFactory};
pub use file::{FileConsumer, FileProducer};
#[cfg(feature = "mmap")]
pub use mmap::MmapProducer;
pub use stream::{InputStream, OutputStream};
pub use temp::TempFileHandler;
pub use value::{ByteOrder, MemoryValue, OwnerId, StreamedValue, ValueSource, swap_words};
pub use wcache::{WRITE_BUFFER_SIZE, WriteCache};
