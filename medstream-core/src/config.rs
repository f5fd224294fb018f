//! Filter configuration.
//!
//! Filters read their settings once, at construction, from an explicit
//! [`FilterConfig`]. Call sites that do not thread a configuration through
//! use the process-wide default from [`FilterConfig::global`].

use crate::error::{Result, StreamError};
use crate::ringbuffer::sizes;
use crate::traits::CompressionLevel;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

static GLOBAL: RwLock<FilterConfig> = RwLock::new(FilterConfig::DEFAULT);

/// Settings for compression filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Level used by newly constructed compression filters.
    pub level: CompressionLevel,
    /// Whether decompression expects a zlib (RFC 1950) header and trailer
    /// instead of a raw deflate (RFC 1951) bitstream.
    pub expect_rfc1950: bool,
    /// Size of each working ring buffer of a filter.
    pub buffer_size: usize,
}

impl FilterConfig {
    /// Raw deflate input, level 6, 4 KB buffers.
    pub const DEFAULT: Self = Self {
        level: CompressionLevel::DEFAULT,
        expect_rfc1950: false,
        buffer_size: sizes::FILTER_BUFFER,
    };

    /// Snapshot of the process-wide default.
    pub fn global() -> Self {
        match GLOBAL.read() {
            Ok(config) => *config,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Replace the process-wide default. Filters that already exist keep
    /// the settings they were built with.
    pub fn set_global(config: Self) -> Result<()> {
        config.validate()?;
        match GLOBAL.write() {
            Ok(mut guard) => *guard = config,
            Err(poisoned) => *poisoned.into_inner() = config,
        }
        Ok(())
    }

    /// Builder-style level override.
    pub fn with_level(mut self, level: impl Into<CompressionLevel>) -> Self {
        self.level = level.into();
        self
    }

    /// Builder-style header expectation override.
    pub fn with_rfc1950(mut self, expect: bool) -> Self {
        self.expect_rfc1950 = expect;
        self
    }

    /// Builder-style buffer size override.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Reject settings no filter can be built with.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(StreamError::illegal_call("filter buffer size must be non-zero"));
        }
        Ok(())
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
