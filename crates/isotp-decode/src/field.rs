//! Fixed-offset fields of a frame line
//!
//! Offsets and lengths are counted in characters of the hex-encoded line, not in bytes on the
//! wire. Every frame starts with the same two fields:
//!
//! | Characters 0..3 | Character 3 |
//! |-----------------|-------------|
//! | node header     | type nibble |
//!
//! followed by the type-specific fields below.
use crate::TpError;

/// A named region of a frame line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub start: usize,
    pub len: usize,
}

pub const NODE_HEADER: Field = Field::new("node header", 0, 3);
pub const TYPE_NIBBLE: Field = Field::new("type nibble", 3, 1);

/// Data length of a Single frame, in bytes
pub const SF_LENGTH: Field = Field::new("SF length", 4, 1);
/// The length of the Single frame payload depends on [SF_LENGTH]
pub const SF_PAYLOAD: Field = Field::new("SF payload", 5, 0);

/// Total message length of a multi-frame transfer, in bytes
pub const FF_LENGTH: Field = Field::new("FF length", 4, 3);
pub const FF_PAYLOAD: Field = Field::new("FF payload", 7, 12);

pub const CF_PAYLOAD: Field = Field::new("CF payload", 5, 14);

pub const FC_FLOW_STATUS: Field = Field::new("FC flow status", 4, 1);
pub const FC_BLOCK_SIZE: Field = Field::new("FC block size", 5, 2);
// Shares its offset with the block size
pub const FC_SEPARATION_TIME: Field = Field::new("FC separation time", 5, 2);

impl Field {
    pub const fn new(name: &'static str, start: usize, len: usize) -> Self {
        Self { name, start, len }
    }

    /// One past the last character of this field
    #[inline]
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    /// The same field, with the given length
    #[inline]
    #[must_use]
    pub const fn with_len(self, len: usize) -> Self {
        Self { len, ..self }
    }

    /// The same field, shortened to at most `len` characters
    #[inline]
    #[must_use]
    pub const fn clamped(self, len: usize) -> Self {
        if len < self.len {
            self.with_len(len)
        } else {
            self
        }
    }

    /// Get this field's text out of the given line
    ///
    /// Fails with [TpError::TruncatedFrame] if the line ends before the field does.
    pub fn extract<'a>(&self, line: &'a str) -> Result<&'a str, TpError> {
        let needed = self.check_len(line)?;
        // Only fails if the field boundaries split a multi-byte character
        line.get(self.start..needed)
            .ok_or_else(|| TpError::MalformedField {
                field: self.name,
                text: String::from_utf8_lossy(&line.as_bytes()[self.start..needed]).into_owned(),
            })
    }

    /// Get the character that covers the first byte of this field
    ///
    /// Unlike [Field::extract], a multi-byte character straddling the field's start is returned
    /// whole, rather than treated as malformed.
    pub fn char_at(&self, line: &str) -> Result<char, TpError> {
        self.check_len(line)?;
        line.char_indices()
            .find(|(i, c)| i + c.len_utf8() > self.start)
            .map(|(_, c)| c)
            .ok_or(TpError::TruncatedFrame {
                field: self.name,
                needed: self.start + 1,
                actual: line.len(),
            })
    }

    fn check_len(&self, line: &str) -> Result<usize, TpError> {
        let needed = self.end();
        if line.len() < needed {
            return Err(TpError::TruncatedFrame {
                field: self.name,
                needed,
                actual: line.len(),
            });
        }
        Ok(needed)
    }
}
