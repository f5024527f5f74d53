//! Errors raised while decoding a single frame

use thiserror::Error;

/// Why a frame could not be applied
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TpError {
    /// The type nibble isn't one of the four ISO-TP frame types. Always fatal.
    #[error("Invalid type of frame: {nibble:?}")]
    UnknownFrameType { nibble: char },

    /// The line ends before the given field does
    #[error("Frame truncated: {field} needs {needed} characters, line has {actual}")]
    TruncatedFrame {
        field: &'static str,
        needed: usize,
        actual: usize,
    },

    /// A field that should be hex isn't
    #[error("Malformed {field}: {text:?} is not a hex number")]
    MalformedField { field: &'static str, text: String },

    /// A Consecutive frame arrived for a node without a First frame before it
    #[error("Consecutive frame from node {node:?} with no transfer in progress")]
    UnexpectedConsecutive { node: String },
}

impl TpError {
    /// Whether this error must stop the whole transcript, even when asked to keep going
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, TpError::UnknownFrameType { .. })
    }
}
