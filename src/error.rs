//! Error types for block-sampled sequences.

use thiserror::Error;

/// Error variants for building, accessing and loading sequences.
#[derive(Debug, Error)]
pub enum Error {
    /// An index (element or block) was provided that is out of the structure's bounds.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of addressable items.
        len: usize,
    },

    /// An input value does not fit the value domain of the chosen container.
    #[error("value {value} at position {index} exceeds the maximum of {max}")]
    ValueDomain {
        /// Position of the value in the input.
        index: usize,
        /// The rejected value.
        value: u64,
        /// Largest representable value.
        max: u64,
    },

    /// Serialized or in-memory data is inconsistent.
    #[error("stream corruption: {0}")]
    StreamCorruption(String),

    /// A caller-supplied decode buffer cannot hold a whole block.
    #[error("buffer too small: need {needed} slots, got {got}")]
    BufferTooSmall {
        /// Required number of slots.
        needed: usize,
        /// Slots provided.
        got: usize,
    },

    /// An I/O error occurred during serialization or deserialization.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Error::StreamCorruption(msg.into())
    }

    /// Map an early EOF from a reader into a corruption error.
    pub(crate) fn from_read(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::StreamCorruption("unexpected end of input".to_string())
        } else {
            Error::Io(err)
        }
    }
}

/// A specialized Result type for sequence operations.
pub type Result<T> = std::result::Result<T, Error>;
