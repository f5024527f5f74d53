//! Drive a [ReassemblyEngine] over the lines of a transcript
use std::io::{BufRead, Lines};
use std::iter::Map;

use crate::{Frame, Message, ReassemblyEngine};

/// Decode the transcript in the given reader, one frame per line
pub fn decode_transcript<R: BufRead>(reader: R) -> TranscriptProcessor<Lines<R>> {
    TranscriptProcessor::new(reader.lines())
}

/// Decode already-read transcript lines
#[allow(clippy::type_complexity)]
pub fn decode_lines<I, S>(
    lines: I,
) -> TranscriptProcessor<Map<I::IntoIter, fn(S) -> std::io::Result<S>>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    TranscriptProcessor::new(lines.into_iter().map(Ok as fn(S) -> std::io::Result<S>))
}

/// Turns transcript lines into [Message]s
///
/// There's one Item for each completed message, in the order they completed. The first error
/// ends the iteration, unless [TranscriptProcessor::keep_going] was asked for and the error
/// isn't fatal.
///
/// Blank lines are skipped, and whitespace around each frame is ignored.
pub struct TranscriptProcessor<I> {
    lines: I,
    engine: ReassemblyEngine,
    line_number: usize,
    keep_going: bool,
    failed: bool,
    exhausted: bool,
}

impl<I> TranscriptProcessor<I> {
    pub fn new(lines: I) -> Self {
        Self {
            lines,
            engine: ReassemblyEngine::new(),
            line_number: 0,
            keep_going: false,
            failed: false,
            exhausted: false,
        }
    }

    /// Skip frames that fail to decode, rather than stopping
    ///
    /// Unknown frame types stop the transcript regardless.
    #[must_use]
    pub fn keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    #[must_use]
    pub fn engine(&self) -> &ReassemblyEngine {
        &self.engine
    }
}

impl<I, S> TranscriptProcessor<I>
where
    I: Iterator<Item = std::io::Result<S>>,
    S: AsRef<str>,
{
    /// Hand every decoded [Message] to `emit`, stopping at the first error
    ///
    /// Messages handed off before an error are unaffected by it.
    pub fn run<F>(mut self, mut emit: F) -> eyre::Result<()>
    where
        F: FnMut(Message) -> eyre::Result<()>,
    {
        for msg in &mut self {
            emit(msg?)?;
        }
        Ok(())
    }
}

impl<I, S> Iterator for TranscriptProcessor<I>
where
    I: Iterator<Item = std::io::Result<S>>,
    S: AsRef<str>,
{
    type Item = eyre::Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.exhausted {
            return None;
        }

        loop {
            let Some(line) = self.lines.next() else {
                self.exhausted = true;
                self.warn_unfinished();
                return None;
            };
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(eyre::eyre!(
                        "Failed to read line {}: {e}",
                        self.line_number + 1
                    )));
                }
            };
            self.line_number += 1;

            let frame = line.as_ref().trim();
            if frame.is_empty() {
                continue;
            }

            let _span = tracing::trace_span!("line", number = self.line_number).entered();
            match self.engine.handle_frame(Frame::new(frame)) {
                Ok(Some(msg)) => return Some(Ok(msg)),
                Ok(None) => {}
                Err(e) if self.keep_going && !e.is_fatal() => {
                    tracing::warn!("Skipping line {} {frame:?}: {e}", self.line_number);
                }
                Err(e) => {
                    self.failed = true;
                    let report = eyre::Report::new(e).wrap_err(format!(
                        "Failed to decode line {}: {frame:?}",
                        self.line_number
                    ));
                    return Some(Err(report));
                }
            }
        }
    }
}

impl<I> TranscriptProcessor<I> {
    /// Only called once the input runs out, not when the caller stops early
    fn warn_unfinished(&self) {
        if self.engine.is_idle() {
            return;
        }
        let unfinished: Vec<_> = self
            .engine
            .in_flight()
            .into_iter()
            .map(|(node, session)| format!("{node} ({} chars short)", session.remaining()))
            .collect();
        tracing::warn!(
            "Transcript ended with unfinished transfers: {}",
            unfinished.join(", ")
        );
    }
}
