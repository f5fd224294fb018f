//! Read cache.
//!
//! Keeps one open [`InputStream`] per owner between partial reads of the
//! same value. The stream's `tell()` at the moment it was cached is the
//! *offset*; `tell() - offset` is how far into the value the stream is.

use crate::stream::InputStream;
use crate::value::OwnerId;
use medstream_core::error::{Result, StreamError};

/// A single cached stream and its owner.
#[derive(Debug, Default)]
pub struct ReadCache {
    stream: Option<InputStream>,
    owner: Option<OwnerId>,
    offset: u64,
}

impl ReadCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if `owner` is the current owner.
    pub fn is_owner(&self, owner: OwnerId) -> bool {
        self.owner == Some(owner)
    }

    /// Cache `stream` for `owner`, dropping whatever was cached before.
    pub fn init(&mut self, stream: InputStream, owner: OwnerId) {
        self.offset = stream.tell();
        self.stream = Some(stream);
        self.owner = Some(owner);
        tracing::debug!(?owner, offset = self.offset, "read cache initialized");
    }

    /// Stream for `owner`: the cached one if `owner` already holds the
    /// cache, otherwise the one returned by `open`.
    pub fn acquire<F>(&mut self, owner: OwnerId, open: F) -> Result<&mut InputStream>
    where
        F: FnOnce() -> Result<InputStream>,
    {
        if self.is_owner(owner) && self.stream.is_some() {
            tracing::trace!(?owner, "read cache hit");
        } else {
            self.clear();
            let stream = open()?;
            self.init(stream, owner);
        }
        self.stream
            .as_mut()
            .ok_or_else(|| StreamError::illegal_call("read cache holds no stream"))
    }

    /// The cached stream, if any.
    pub fn stream_mut(&mut self) -> Option<&mut InputStream> {
        self.stream.as_mut()
    }

    /// `tell()` of the cached stream when it was cached.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes the cached stream has advanced since it was cached.
    pub fn position(&self) -> Option<u64> {
        self.stream
            .as_ref()
            .map(|stream| stream.tell().saturating_sub(self.offset))
    }

    /// Drop the cached stream and forget the owner.
    pub fn clear(&mut self) {
        self.stream = None;
        self.owner = None;
        self.offset = 0;
    }
}
