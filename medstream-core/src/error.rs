//! Error types for medstream operations.
//!
//! Every producer, consumer, filter and stream carries a [`StickyStatus`]:
//! the first error it records is kept, and every later operation makes zero
//! progress and reports that same error. [`StreamError`] is therefore
//! `Clone`, and I/O failures are stored by kind and message rather than as
//! the original [`io::Error`].

use std::io;
use thiserror::Error;

/// The main error type for medstream operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// A buffer could not be allocated.
    #[error("Memory exhausted: cannot allocate {requested} bytes")]
    MemoryExhausted {
        /// Number of bytes requested.
        requested: usize,
    },

    /// A second compression filter was installed on a stream.
    #[error("Only one compression filter may be installed per stream")]
    DoubleCompressionFilters,

    /// The requested stream compression is not supported.
    #[error("Unsupported stream encoding: {encoding}")]
    UnsupportedEncoding {
        /// Name of the rejected encoding.
        encoding: String,
    },

    /// A rewind was requested beyond the retained window.
    #[error("Putback failed: requested {requested} bytes, only {available} retained")]
    PutbackFailed {
        /// Number of bytes the caller wanted to un-deliver.
        requested: u64,
        /// Number of bytes that could have been un-delivered.
        available: u64,
    },

    /// The compression library reported an error.
    #[error("Codec error: {message}")]
    Codec {
        /// Diagnostic text from the codec.
        message: String,
    },

    /// The API was used in a way that is not permitted.
    #[error("Illegal call: {message}")]
    IllegalCall {
        /// What was misused.
        message: String,
    },

    /// I/O error from an underlying file or standard stream.
    #[error("I/O error ({kind:?}): {message}")]
    Io {
        /// The original error kind.
        kind: io::ErrorKind,
        /// The original error text.
        message: String,
    },

    /// A stream ended before the expected number of bytes were delivered.
    #[error("Unexpected end of stream: expected {expected} more bytes")]
    UnexpectedEof {
        /// Number of bytes that were expected but not available.
        expected: u64,
    },
}

/// Result type alias for medstream operations.
pub type Result<T> = std::result::Result<T, StreamError>;

impl From<io::Error> for StreamError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Io { kind, message } => io::Error::new(kind, message),
            StreamError::UnexpectedEof { .. } => {
                io::Error::new(io::ErrorKind::UnexpectedEof, err.to_string())
            }
            StreamError::MemoryExhausted { .. } => {
                io::Error::new(io::ErrorKind::OutOfMemory, err.to_string())
            }
            other => io::Error::other(other.to_string()),
        }
    }
}

impl StreamError {
    /// Create a memory exhausted error.
    pub fn memory_exhausted(requested: usize) -> Self {
        Self::MemoryExhausted { requested }
    }

    /// Create an unsupported encoding error.
    pub fn unsupported_encoding(encoding: impl Into<String>) -> Self {
        Self::UnsupportedEncoding {
            encoding: encoding.into(),
        }
    }

    /// Create a putback failure.
    pub fn putback_failed(requested: u64, available: u64) -> Self {
        Self::PutbackFailed {
            requested,
            available,
        }
    }

    /// Create a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Create an illegal call error.
    pub fn illegal_call(message: impl Into<String>) -> Self {
        Self::IllegalCall {
            message: message.into(),
        }
    }

    /// Create an unexpected end-of-stream error.
    pub fn unexpected_eof(expected: u64) -> Self {
        Self::UnexpectedEof { expected }
    }
}

/// First-error-wins status holder.
///
/// Components check [`StickyStatus::good`] at the top of every operation and
/// return zero progress once it is poisoned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StickyStatus {
    error: Option<StreamError>,
}

impl StickyStatus {
    /// Create a status in the good state.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` while no error has been recorded.
    #[inline]
    pub fn good(&self) -> bool {
        self.error.is_none()
    }

    /// `Ok(())` while good, otherwise a clone of the recorded error.
    pub fn check(&self) -> Result<()> {
        match &self.error {
            None => Ok(()),
            Some(err) => Err(err.clone()),
        }
    }

    /// The recorded error, if any.
    pub fn error(&self) -> Option<&StreamError> {
        self.error.as_ref()
    }

    /// Record `err` unless an earlier error is already held.
    pub fn fail(&mut self, err: StreamError) {
        if self.error.is_none() {
            tracing::debug!(error = %err, "stream status poisoned");
            self.error = Some(err);
        }
    }

    /// Record the error of `result`, if any, and pass it through.
    pub fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.fail(err.clone());
        }
        result
    }
}
