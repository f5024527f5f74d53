use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::field::FF_PAYLOAD;
use crate::frame::{
    ClassifiedFrame, ConsecutiveFrame, FirstFrame, FlowControlFrame, Frame, SingleFrame,
};
use crate::{Message, TpError};

/// A multi-frame transfer that has seen its First frame, but not yet its last Consecutive frame
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReassemblySession {
    payload: String,
    remaining: usize,
}

impl ReassemblySession {
    /// The hex payload collected so far
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// How many hex characters are still expected
    ///
    /// Never zero; a session that reaches zero is finished and handed off as a [Message].
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

/// Reassemble ISO-TP transfers into [Message]s, one frame at a time
///
/// Each node header gets at most one in-flight transfer. Frames must be given in order; the
/// Consecutive frame sequence numbers aren't checked.
#[derive(Debug, Default)]
pub struct ReassemblyEngine {
    sessions: HashMap<String, ReassemblySession>,
}

/// Public API
impl ReassemblyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle the next transcript line
    pub fn handle_line(&mut self, line: &str) -> Result<Option<Message>, TpError> {
        self.handle_frame(Frame::new(line))
    }

    /// Handle the next frame, returning a [Message] if the frame completed one
    ///
    /// On error, the frame has no effect on any in-flight transfer.
    pub fn handle_frame(&mut self, frame: Frame<'_>) -> Result<Option<Message>, TpError> {
        match frame.classify()? {
            ClassifiedFrame::Single(frame) => self.handle_single(frame),
            ClassifiedFrame::First(frame) => self.handle_first(frame),
            ClassifiedFrame::Consecutive(frame) => self.handle_consecutive(frame),
            ClassifiedFrame::FlowControl(frame) => self.handle_flow_control(frame),
        }
    }

    /// The in-flight transfer for the given node, if there is one
    #[must_use]
    pub fn session(&self, node: &str) -> Option<&ReassemblySession> {
        self.sessions.get(node)
    }

    /// All in-flight transfers, sorted by node header
    pub fn in_flight(&self) -> Vec<(&str, &ReassemblySession)> {
        let mut sessions: Vec<_> = self
            .sessions
            .iter()
            .map(|(node, session)| (node.as_str(), session))
            .collect();
        sessions.sort_unstable_by_key(|(node, _)| *node);
        sessions
    }

    /// True if no transfer is in flight
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Private implementation
impl ReassemblyEngine {
    fn handle_single(&mut self, frame: SingleFrame<'_>) -> Result<Option<Message>, TpError> {
        let node = frame.frame().node_header()?;
        let payload = frame.payload()?;
        if self.sessions.contains_key(node) {
            // Leaves the in-flight transfer alone
            tracing::debug!("Single frame from {node} in the middle of a multi-frame transfer");
        }
        tracing::debug!("Single frame. node: {node} len: {}", payload.len() / 2);
        Ok(Some(Message::new(node, payload)))
    }

    fn handle_first(&mut self, frame: FirstFrame<'_>) -> Result<Option<Message>, TpError> {
        let node = frame.frame().node_header()?;
        let total = frame.message_chars()?;
        let payload = frame.payload(total)?;

        if let Some(abandoned) = self.sessions.remove(node) {
            tracing::warn!(
                "First frame from {node} abandons its in-flight transfer with {} chars left: {}",
                abandoned.remaining,
                abandoned.payload,
            );
        }

        if total <= FF_PAYLOAD.len {
            tracing::debug!("First frame holds the whole message. node: {node} len: {total}");
            return Ok(Some(Message::new(node, payload)));
        }

        let session = ReassemblySession {
            payload: payload.to_string(),
            remaining: total - payload.len(),
        };
        tracing::debug!(
            "Start ISO-TP session. node: {node} len: {}/{total}",
            session.payload.len()
        );
        self.sessions.insert(node.to_string(), session);
        Ok(None)
    }

    fn handle_consecutive(
        &mut self,
        frame: ConsecutiveFrame<'_>,
    ) -> Result<Option<Message>, TpError> {
        let node = frame.frame().node_header()?;
        let Entry::Occupied(mut entry) = self.sessions.entry(node.to_string()) else {
            return Err(TpError::UnexpectedConsecutive {
                node: node.to_string(),
            });
        };

        let session = entry.get_mut();
        let chunk = frame.payload(session.remaining)?;
        session.payload.push_str(chunk);
        session.remaining -= chunk.len();
        tracing::trace!(
            "Consecutive frame. node: {node} len: {} remaining: {}",
            session.payload.len(),
            session.remaining,
        );
        if session.remaining > 0 {
            return Ok(None);
        }

        let session = entry.remove();
        tracing::debug!(
            "Finished ISO-TP session. node: {node} len: {}",
            session.payload.len()
        );
        Ok(Some(Message::new(node, session.payload)))
    }

    fn handle_flow_control(
        &mut self,
        frame: FlowControlFrame<'_>,
    ) -> Result<Option<Message>, TpError> {
        let node = frame.frame().node_header()?;
        let info = frame.info()?;
        tracing::trace!(
            "Flow control. node: {node} status: {:?} block size: {} separation time: {:#X}",
            info.status,
            info.block_size,
            info.separation_time,
        );
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle_all(engine: &mut ReassemblyEngine, lines: &[&str]) -> Vec<Message> {
        lines
            .iter()
            .filter_map(|line| engine.handle_line(line).unwrap())
            .collect()
    }

    /// 20 byte message: 6 in the First frame, then 7, then the last 7
    fn multi_frame_fixture() -> ([&'static str; 4], Message) {
        let frames = [
            "7e01014000102030405",
            "7e83000000",
            "7e021060708090a0b0c",
            "7e0220d0e0f10111213",
        ];
        let msg = Message::new("7e0", "000102030405060708090a0b0c0d0e0f10111213");
        (frames, msg)
    }

    #[test]
    fn test_single_frame() {
        let mut engine = ReassemblyEngine::new();
        let msg = engine.handle_line("7e803aabbcc").unwrap();
        assert_eq!(msg, Some(Message::new("7e8", "aabbcc")));
        assert!(engine.is_idle());
    }

    #[test]
    fn test_single_frame_ignores_padding() {
        let mut engine = ReassemblyEngine::new();
        let msg = engine.handle_line("7e802aabbccddeeff00").unwrap();
        assert_eq!(msg, Some(Message::new("7e8", "aabb")));
    }

    #[test]
    fn test_multi_frame() {
        let (frames, expected) = multi_frame_fixture();

        let mut engine = ReassemblyEngine::new();
        assert_eq!(engine.handle_line(frames[0]).unwrap(), None);
        assert_eq!(engine.session("7e0").unwrap().remaining(), 40 - 12);
        assert_eq!(engine.handle_line(frames[1]).unwrap(), None);
        assert_eq!(engine.session("7e0").unwrap().remaining(), 40 - 12);
        assert_eq!(engine.handle_line(frames[2]).unwrap(), None);
        assert_eq!(engine.session("7e0").unwrap().remaining(), 40 - 12 - 14);
        assert_eq!(engine.handle_line(frames[3]).unwrap(), Some(expected));
        assert!(engine.is_idle());
    }

    #[test]
    fn test_multi_frame_payload_sums_to_declared_length() {
        let (frames, expected) = multi_frame_fixture();
        let mut engine = ReassemblyEngine::new();
        let msgs = handle_all(&mut engine, &frames);
        assert_eq!(msgs, [expected]);
        assert_eq!(msgs[0].payload.len(), 0x014 * 2);
        assert_eq!(msgs[0].len(), 0x014);
    }

    #[test]
    fn test_last_consecutive_frame_is_clamped() {
        // 15 bytes: 6 + 7 + 2
        let frames = [
            "abc100f000102030405",
            "abc2106070809101112",
            "abc221314aaaaaaaaaa",
        ];
        let mut engine = ReassemblyEngine::new();
        let msgs = handle_all(&mut engine, &frames);
        assert_eq!(
            msgs,
            [Message::new("abc", "000102030405060708091011121314")]
        );
    }

    #[test]
    fn test_last_consecutive_frame_may_be_short() {
        // 14 bytes: 6 + 7 + 1, without padding on the last frame
        let frames = ["abc100e000102030405", "abc2106070809101112", "abc2213"];
        let mut engine = ReassemblyEngine::new();
        let msgs = handle_all(&mut engine, &frames);
        assert_eq!(msgs, [Message::new("abc", "0001020304050607080910111213")]);
    }

    #[test]
    fn test_consecutive_clamp_boundaries() {
        let line = "abc210d0e0f10111213";
        let full = "0d0e0f10111213";
        for remaining in [1, 13, 14, 15] {
            let mut engine = ReassemblyEngine::new();
            engine.sessions.insert(
                "abc".to_string(),
                ReassemblySession {
                    payload: "00".to_string(),
                    remaining,
                },
            );

            let msg = engine.handle_line(line).unwrap();
            let taken = remaining.min(14);
            let expected_payload = format!("00{}", &full[..taken]);
            if remaining > 14 {
                assert_eq!(msg, None, "remaining {remaining}");
                let session = engine.session("abc").unwrap();
                assert_eq!(session.remaining(), remaining - 14);
                assert_eq!(session.payload(), expected_payload);
            } else {
                assert_eq!(
                    msg,
                    Some(Message::new("abc", expected_payload)),
                    "remaining {remaining}"
                );
                assert!(engine.is_idle());
            }
        }
    }

    #[test]
    fn test_first_frame_holds_whole_message() {
        let mut engine = ReassemblyEngine::new();
        // 6 bytes fills the First frame exactly
        let msg = engine.handle_line("abc1006000102030405").unwrap();
        assert_eq!(msg, Some(Message::new("abc", "000102030405")));
        assert!(engine.is_idle());

        // 2 bytes only reads the first 4 characters, so padding doesn't matter
        let msg = engine.handle_line("abc10020a0b").unwrap();
        assert_eq!(msg, Some(Message::new("abc", "0a0b")));

        let msg = engine.handle_line("abc1000").unwrap();
        assert_eq!(msg, Some(Message::new("abc", "")));
        assert!(engine.is_idle());
    }

    #[test]
    fn test_short_first_frame_lines() {
        let mut engine = ReassemblyEngine::new();
        // Lines only need to be as long as the declared length
        let msg = engine.handle_line("abc100112").unwrap();
        assert_eq!(msg, Some(Message::new("abc", "12")));

        let err = engine.handle_line("abc1003aabb").unwrap_err();
        assert!(matches!(
            err,
            TpError::TruncatedFrame { field: "FF payload", needed: 13, actual: 11 }
        ));
        assert!(engine.is_idle());
    }

    #[test]
    fn test_flow_control_has_no_effect() {
        let (frames, expected) = multi_frame_fixture();
        for fc in ["7e83000000", "7e8310a0a", "7e832ffff", "7e83f1234"] {
            let mut engine = ReassemblyEngine::new();
            assert_eq!(engine.handle_line(fc).unwrap(), None);
            assert!(engine.is_idle());

            assert_eq!(engine.handle_line(frames[0]).unwrap(), None);
            let before = engine.session("7e0").cloned();
            assert_eq!(engine.handle_line(fc).unwrap(), None);
            assert_eq!(engine.session("7e0").cloned(), before);

            let msgs = handle_all(&mut engine, &frames[2..]);
            assert_eq!(msgs, [expected.clone()]);
        }
    }

    #[test]
    fn test_single_frame_mid_transfer() {
        let (frames, expected) = multi_frame_fixture();
        let mut engine = ReassemblyEngine::new();

        assert_eq!(engine.handle_line(frames[0]).unwrap(), None);
        let msg = engine.handle_line("7e00211ff").unwrap();
        assert_eq!(msg, Some(Message::new("7e0", "11ff")));

        let msgs = handle_all(&mut engine, &frames[1..]);
        assert_eq!(msgs, [expected]);
    }

    #[test]
    fn test_interleaved_nodes() {
        let frames = [
            "7e0100a000102030405",
            "7e8100a101112131415",
            "7e82116171819",
            "7e02106070809",
        ];
        let mut engine = ReassemblyEngine::new();
        let msgs = handle_all(&mut engine, &frames);
        assert_eq!(
            msgs,
            [
                Message::new("7e8", "10111213141516171819"),
                Message::new("7e0", "00010203040506070809"),
            ]
        );
        assert!(engine.is_idle());
    }

    #[test]
    fn test_first_frame_restarts_transfer() {
        let mut engine = ReassemblyEngine::new();
        assert_eq!(engine.handle_line("7e0100a000102030405").unwrap(), None);
        assert_eq!(engine.handle_line("7e0100aaaaaaaaaaaaa").unwrap(), None);
        let msg = engine.handle_line("7e021bbbbbbbb").unwrap();
        assert_eq!(msg, Some(Message::new("7e0", "aaaaaaaaaaaabbbbbbbb")));
    }

    #[test]
    fn test_consecutive_without_first_frame() {
        let mut engine = ReassemblyEngine::new();
        assert_eq!(
            engine.handle_line("7e021060708090a0b0c0d"),
            Err(TpError::UnexpectedConsecutive {
                node: "7e0".to_string()
            })
        );

        // Another node's transfer doesn't count
        engine.handle_line("7e8100a101112131415").unwrap();
        assert!(matches!(
            engine.handle_line("7e021060708090a0b0c0d"),
            Err(TpError::UnexpectedConsecutive { .. })
        ));
    }

    #[test]
    fn test_errors_leave_state_alone() {
        let mut engine = ReassemblyEngine::new();
        engine.handle_line("7e01014000102030405").unwrap();
        let before = engine.session("7e0").cloned();

        // Truncated Consecutive frame: needs 14 characters, has 4
        assert!(matches!(
            engine.handle_line("7e0210607"),
            Err(TpError::TruncatedFrame { field: "CF payload", .. })
        ));
        // Truncated First frame from the same node doesn't abandon the transfer
        assert!(matches!(
            engine.handle_line("7e010140001"),
            Err(TpError::TruncatedFrame { field: "FF payload", .. })
        ));
        assert!(matches!(
            engine.handle_line("7e09"),
            Err(TpError::UnknownFrameType { nibble: '9' })
        ));
        assert_eq!(engine.session("7e0").cloned(), before);
    }

    #[test]
    fn test_in_flight() {
        let mut engine = ReassemblyEngine::new();
        engine.handle_line("7e8100a101112131415").unwrap();
        engine.handle_line("7e01014000102030405").unwrap();
        let in_flight: Vec<_> = engine
            .in_flight()
            .into_iter()
            .map(|(node, session)| (node, session.remaining()))
            .collect();
        assert_eq!(in_flight, [("7e0", 28), ("7e8", 8)]);
    }
}
