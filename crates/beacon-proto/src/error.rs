//! mDNS wire format error types.

use thiserror::Error;

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// mDNS codec errors.
///
/// All of these indicate a malformed datagram; the dispatch layer recovers
/// by logging and dropping the offending packet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Buffer is too short to contain the expected data.
    #[error("buffer too short: expected at least {expected} bytes, got {actual}")]
    BufferTooShort {
        /// Expected minimum size.
        expected: usize,
        /// Actual buffer size.
        actual: usize,
    },

    /// Unexpected end of data while parsing.
    #[error("unexpected end of data at offset {offset}")]
    UnexpectedEof {
        /// Byte offset where the overrun would have happened.
        offset: usize,
    },

    /// Invalid data encountered during parsing.
    #[error("invalid data at offset {offset}: {message}")]
    InvalidData {
        /// Byte offset of the invalid data.
        offset: usize,
        /// Description of the error.
        message: String,
    },

    /// Label exceeds the maximum length of 63 bytes.
    #[error("label too long: {length} bytes exceeds maximum of 63")]
    LabelTooLong {
        /// Actual label length.
        length: usize,
    },

    /// Domain name exceeds the maximum wire length of 255 bytes.
    #[error("name too long: {length} bytes exceeds maximum of 255")]
    NameTooLong {
        /// Actual name length in wire format.
        length: usize,
    },

    /// Empty label in the middle of a domain name.
    #[error("empty label at position {position}")]
    EmptyLabel {
        /// Position of the empty label.
        position: usize,
    },

    /// Compression pointer whose target lies outside the datagram.
    #[error("invalid compression pointer at offset {offset}: points to {target}")]
    InvalidCompressionPointer {
        /// Offset of the pointer.
        offset: usize,
        /// Target offset the pointer references.
        target: usize,
    },

    /// Compression pointer chain did not terminate within the jump limit.
    #[error("compression pointer loop detected at offset {offset}")]
    CompressionLoop {
        /// Offset of the name whose resolution looped.
        offset: usize,
    },

    /// A single name resolved more labels than the decoder allows.
    #[error("name resolves too many labels (>{max_labels})")]
    TooManyLabels {
        /// The decoder's label limit.
        max_labels: usize,
    },

    /// Fixed-size RDATA with the wrong length for its record type.
    #[error("RDATA length mismatch for {rtype}: expected {expected}, got {actual}")]
    RDataLengthMismatch {
        /// Record type name.
        rtype: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Declared RDATA length reaches past the end of the datagram.
    #[error("RDATA length {rdlength} exceeds remaining {remaining} bytes")]
    RDataOverflow {
        /// Declared RDATA length.
        rdlength: usize,
        /// Bytes actually remaining in the datagram.
        remaining: usize,
    },
}

impl Error {
    /// Creates a new `BufferTooShort` error.
    #[inline]
    pub fn buffer_too_short(expected: usize, actual: usize) -> Self {
        Self::BufferTooShort { expected, actual }
    }

    /// Creates a new `UnexpectedEof` error.
    #[inline]
    pub fn unexpected_eof(offset: usize) -> Self {
        Self::UnexpectedEof { offset }
    }

    /// Creates a new `InvalidData` error.
    #[inline]
    pub fn invalid_data(offset: usize, message: impl Into<String>) -> Self {
        Self::InvalidData {
            offset,
            message: message.into(),
        }
    }
}
