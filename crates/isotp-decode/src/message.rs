use std::fmt;
use std::io::Write;

use serde::ser::SerializeStruct;

/// A complete higher-layer message
///
/// Either a whole Single frame, or a reassembled First + Consecutive transfer. The payload is
/// kept in the hex text it was transcribed with.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    pub node: String,
    pub payload: String,
}

impl Message {
    pub fn new(node: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            payload: payload.into(),
        }
    }

    /// Payload length in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len() / 2
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Write this message as a `node: payload` line
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "{self}")
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.node, self.payload)
    }
}

impl serde::Serialize for Message {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Message", 3)?;
        state.serialize_field("node", &self.node)?;
        state.serialize_field("length", &self.len())?;
        state.serialize_field("payload", &self.payload)?;
        state.end()
    }
}
