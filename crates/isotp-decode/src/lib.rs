//! Reassemble ISO 15765-2 (ISO-TP) messages from transcripts of hex-encoded frames
//!
//! Each transcript line holds one frame, laid out at fixed character offsets:
//!
//! ```text
//! abc0 3 aabbcc              Single frame, 3 bytes
//! abc1 012 000102030405      First frame, 0x012 bytes total, first 6 bytes
//! abc2 06070809...           Consecutive frame, up to 7 more bytes
//! def3 0 00 ..               Flow Control frame
//! ```
//!
//! (spaces added for readability; transcripts don't have them)
//!
//! Frames flow through [Frame] for field extraction and classification, then through the
//! [ReassemblyEngine], which keeps one in-flight transfer per node header. The
//! [TranscriptProcessor] ties the two together over a stream of lines.
pub mod error;
pub mod field;
pub mod frame;
pub mod hex;
pub mod message;
pub mod session;
pub mod stdio;
pub mod transcript;

pub use error::TpError;
pub use frame::{ClassifiedFrame, FlowControlInfo, FlowStatus, Frame, FrameKind};
pub use message::Message;
pub use session::{ReassemblyEngine, ReassemblySession};
pub use transcript::{TranscriptProcessor, decode_lines, decode_transcript};

#[cfg(test)]
#[ctor::ctor]
fn setup_test_logging() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .with_ansi(true)
        .init();
}
