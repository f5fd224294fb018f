//! Shared temporary files.
//!
//! Values too large to hold in memory (for example a decompressed pixel
//! item) are spooled to a temporary file once and then read back through
//! any number of stream factories. The file is deleted when the last
//! [`Arc<TempFileHandler>`] is dropped.

use crate::stream::{InputStream, OutputStream};
use medstream_core::config::FilterConfig;
use medstream_core::error::Result;
use std::path::Path;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempPath};

/// Owner of one temporary file.
#[derive(Debug)]
pub struct TempFileHandler {
    path: TempPath,
}

impl TempFileHandler {
    /// Create an empty temporary file in the system temp directory.
    pub fn create() -> Result<Arc<Self>> {
        let file = NamedTempFile::new()?;
        let path = file.into_temp_path();
        tracing::debug!(path = %path.display(), "temporary file created");
        Ok(Arc::new(Self { path }))
    }

    /// Create an empty temporary file in `dir`.
    pub fn create_in<P: AsRef<Path>>(dir: P) -> Result<Arc<Self>> {
        let file = NamedTempFile::new_in(dir)?;
        Ok(Arc::new(Self {
            path: file.into_temp_path(),
        }))
    }

    /// Location of the file while it exists.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stream that (re)writes the file from the start.
    pub fn output_stream(&self) -> Result<OutputStream> {
        OutputStream::create(self.path())
    }

    /// Stream over the file starting at `offset`; the stream keeps the file
    /// alive.
    pub fn input_stream(self: &Arc<Self>, offset: u64) -> Result<InputStream> {
        InputStream::open_temp(Arc::clone(self), offset, FilterConfig::global())
    }
}

impl Drop for TempFileHandler {
    fn drop(&mut self) {
        tracing::debug!(path = %self.path.display(), "removing temporary file");
    }
}
