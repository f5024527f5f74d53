use crate::TpError;
use crate::field::{
    CF_PAYLOAD, FC_BLOCK_SIZE, FC_FLOW_STATUS, FC_SEPARATION_TIME, FF_LENGTH, FF_PAYLOAD, Field,
    NODE_HEADER, SF_LENGTH, SF_PAYLOAD, TYPE_NIBBLE,
};
use crate::hex::hex_to_int;

/// One line of a transcript
///
/// A [Frame] doesn't interpret anything up front. Fields are extracted, and bounds-checked, as
/// they're asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame<'a> {
    line: &'a str,
}

/// The ISO 15765-2 Protocol Control Information type, from the frame's type nibble
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// `0` - a complete message in one frame
    Single,
    /// `1` - the start of a multi-frame transfer
    First,
    /// `2` - the rest of a multi-frame transfer
    Consecutive,
    /// `3` - receiver to sender pacing
    FlowControl,
}

impl FrameKind {
    pub fn classify(nibble: char) -> Result<Self, TpError> {
        match nibble {
            '0' => Ok(FrameKind::Single),
            '1' => Ok(FrameKind::First),
            '2' => Ok(FrameKind::Consecutive),
            '3' => Ok(FrameKind::FlowControl),
            _ => Err(TpError::UnknownFrameType { nibble }),
        }
    }
}

impl TryFrom<char> for FrameKind {
    type Error = TpError;

    fn try_from(nibble: char) -> Result<Self, Self::Error> {
        Self::classify(nibble)
    }
}

/// A [Frame] whose [FrameKind] is known
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassifiedFrame<'a> {
    Single(SingleFrame<'a>),
    First(FirstFrame<'a>),
    Consecutive(ConsecutiveFrame<'a>),
    FlowControl(FlowControlFrame<'a>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct SingleFrame<'a>(Frame<'a>);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct FirstFrame<'a>(Frame<'a>);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct ConsecutiveFrame<'a>(Frame<'a>);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct FlowControlFrame<'a>(Frame<'a>);

/// The flow status nibble of a Flow Control frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowStatus {
    ContinueToSend,
    Wait,
    /// Overflow; the receiver can't take the message
    Abort,
    /// `3` through `F` are reserved by ISO 15765-2
    Reserved(u8),
}

/// What a Flow Control frame asked of the sender
///
/// Only ever logged; reassembly doesn't pace itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlowControlInfo {
    pub status: FlowStatus,
    pub block_size: u8,
    pub separation_time: u8,
}

impl<'a> Frame<'a> {
    pub fn new(line: &'a str) -> Self {
        Self { line }
    }

    #[inline]
    pub fn field(&self, field: Field) -> Result<&'a str, TpError> {
        field.extract(self.line)
    }

    /// Identifies the node that sent this frame
    #[inline]
    pub fn node_header(&self) -> Result<&'a str, TpError> {
        self.field(NODE_HEADER)
    }

    /// Any character at all, so that non-hex and non-ASCII nibbles are classified as unknown
    pub fn type_nibble(&self) -> Result<char, TpError> {
        TYPE_NIBBLE.char_at(self.line)
    }

    pub fn kind(&self) -> Result<FrameKind, TpError> {
        FrameKind::classify(self.type_nibble()?)
    }

    /// Classify this frame, giving access to the fields specific to its kind
    pub fn classify(self) -> Result<ClassifiedFrame<'a>, TpError> {
        let classified = match self.kind()? {
            FrameKind::Single => ClassifiedFrame::Single(SingleFrame(self)),
            FrameKind::First => ClassifiedFrame::First(FirstFrame(self)),
            FrameKind::Consecutive => ClassifiedFrame::Consecutive(ConsecutiveFrame(self)),
            FrameKind::FlowControl => ClassifiedFrame::FlowControl(FlowControlFrame(self)),
        };
        Ok(classified)
    }

    fn hex_field(&self, field: Field) -> Result<u32, TpError> {
        hex_to_int(field.name, self.field(field)?)
    }
}

/// Single frame
///
/// | 0..3 | 3   | 4           | 5..5+2n |
/// |------|-----|-------------|---------|
/// | node | `0` | length `n`  | payload |
impl<'a> SingleFrame<'a> {
    #[inline]
    #[must_use]
    pub fn frame(&self) -> &Frame<'a> {
        &self.0
    }

    /// Payload length in bytes
    pub fn data_length(&self) -> Result<usize, TpError> {
        Ok(self.0.hex_field(SF_LENGTH)? as usize)
    }

    /// The `2n` hex characters following the length digit
    pub fn payload(&self) -> Result<&'a str, TpError> {
        let chars = self.data_length()? * 2;
        self.0.field(SF_PAYLOAD.with_len(chars))
    }
}

/// First frame
///
/// | 0..3 | 3   | 4..7               | 7..19          |
/// |------|-----|--------------------|----------------|
/// | node | `1` | total length bytes | 6 payload bytes |
impl<'a> FirstFrame<'a> {
    #[inline]
    #[must_use]
    pub fn frame(&self) -> &Frame<'a> {
        &self.0
    }

    /// Length of the whole reassembled payload, in hex characters
    pub fn message_chars(&self) -> Result<usize, TpError> {
        Ok(self.0.hex_field(FF_LENGTH)? as usize * 2)
    }

    /// The payload carried in this frame, at most `limit` characters of it
    pub fn payload(&self, limit: usize) -> Result<&'a str, TpError> {
        self.0.field(FF_PAYLOAD.clamped(limit))
    }
}

/// Consecutive frame
///
/// | 0..3 | 3   | 4        | 5..19           |
/// |------|-----|----------|-----------------|
/// | node | `2` | sequence | 7 payload bytes |
///
/// The sequence number isn't checked; frames are assumed to arrive in order.
impl<'a> ConsecutiveFrame<'a> {
    #[inline]
    #[must_use]
    pub fn frame(&self) -> &Frame<'a> {
        &self.0
    }

    /// The payload carried in this frame, at most `limit` characters of it
    ///
    /// The last frame of a transfer is only read as far as the transfer needs.
    pub fn payload(&self, limit: usize) -> Result<&'a str, TpError> {
        self.0.field(CF_PAYLOAD.clamped(limit))
    }
}

/// Flow Control frame
///
/// | 0..3 | 3   | 4           | 5..7                              |
/// |------|-----|-------------|-----------------------------------|
/// | node | `3` | flow status | block size, and separation time   |
impl<'a> FlowControlFrame<'a> {
    #[inline]
    #[must_use]
    pub fn frame(&self) -> &Frame<'a> {
        &self.0
    }

    pub fn info(&self) -> Result<FlowControlInfo, TpError> {
        let status = match self.0.hex_field(FC_FLOW_STATUS)? {
            0 => FlowStatus::ContinueToSend,
            1 => FlowStatus::Wait,
            2 => FlowStatus::Abort,
            // A single hex digit always fits
            other => FlowStatus::Reserved(other as u8),
        };
        // Two hex digits always fit in a u8
        let block_size = self.0.hex_field(FC_BLOCK_SIZE)? as u8;
        let separation_time = self.0.hex_field(FC_SEPARATION_TIME)? as u8;

        Ok(FlowControlInfo {
            status,
            block_size,
            separation_time,
        })
    }
}
