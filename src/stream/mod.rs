pub mod frame;
pub mod lines;

use std::collections::VecDeque;

use bytes::Bytes;
use futures_util::Stream;

pub use frame::{interpret_line, parse_delta_payload, FrameAction, DATA_PREFIX, DONE_TOKEN};
pub use lines::LineDecoder;

use crate::error::ChatError;

/// One decoded event of an incremental response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaEvent {
    Text(String),
    Done,
}

/// A data payload that failed to parse, waiting for the rest of its text.
#[derive(Debug)]
struct Carry {
    payload: String,
    attempts: u32,
}

/// Turns raw body chunks into [`DeltaEvent`]s.
///
/// A data frame whose JSON does not parse is held back as a carry and
/// interpretation halts until the next chunk arrives. The next line is then
/// appended to the carry and the result parsed again. A following `data: `
/// line means the carry was never a fragment; it is dropped and the new line
/// is interpreted on its own. After `max_frame_retries` failed re-joins the
/// carry is dropped as well.
#[derive(Debug)]
pub struct DeltaDecoder {
    lines: LineDecoder,
    carry: Option<Carry>,
    halted: bool,
    finished: bool,
    max_frame_retries: u32,
}

impl DeltaDecoder {
    #[must_use]
    pub fn new(max_frame_retries: u32) -> Self {
        Self {
            lines: LineDecoder::new(),
            carry: None,
            halted: false,
            finished: false,
            max_frame_retries: max_frame_retries.max(1),
        }
    }

    /// True once `[DONE]` was seen or [`DeltaDecoder::finish_into`] ran.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed a body chunk and append any complete events to `out`.
    pub fn feed_into(&mut self, chunk: &[u8], out: &mut Vec<DeltaEvent>) {
        if self.finished {
            return;
        }
        self.lines.push_chunk(chunk);
        self.halted = false;
        self.drain_lines(out, true);
    }

    /// Feed a body chunk and return the events it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<DeltaEvent> {
        let mut out = Vec::new();
        self.feed_into(chunk, &mut out);
        out
    }

    /// Source exhausted: interpret lines still queued behind a halt, then drop
    /// any carry and the unterminated tail.
    pub fn finish_into(&mut self, out: &mut Vec<DeltaEvent>) {
        if self.finished {
            return;
        }
        self.halted = false;
        self.drain_lines(out, false);
        if let Some(carry) = self.carry.take() {
            tracing::warn!(
                payload_len = carry.payload.len(),
                attempts = carry.attempts,
                "dropping malformed frame at end of stream"
            );
        }
        let dropped = self.lines.finish();
        if dropped > 0 {
            tracing::debug!(bytes = dropped, "discarding unterminated trailing line");
        }
        self.finished = true;
    }

    /// Forget all buffered state so the decoder can serve a new cycle.
    pub fn reset(&mut self) {
        self.lines.clear();
        self.carry = None;
        self.halted = false;
        self.finished = false;
    }

    fn drain_lines(&mut self, out: &mut Vec<DeltaEvent>, halt_on_malformed: bool) {
        while !self.halted && !self.finished {
            let Some(line) = self.lines.next_line() else {
                break;
            };

            if let Some(carry) = self.carry.take() {
                if line.starts_with(DATA_PREFIX) {
                    tracing::warn!(
                        payload_len = carry.payload.len(),
                        "dropping malformed frame superseded by a new data frame"
                    );
                } else {
                    self.retry_carry(carry, &line, out, halt_on_malformed);
                    continue;
                }
            }

            match interpret_line(&line) {
                FrameAction::Skip => {}
                FrameAction::Done => {
                    out.push(DeltaEvent::Done);
                    self.finished = true;
                    self.lines.clear();
                }
                FrameAction::Delta(text) => out.push(DeltaEvent::Text(text)),
                FrameAction::Malformed(payload) => {
                    tracing::debug!(
                        payload_len = payload.len(),
                        "data frame is not complete JSON, waiting for more bytes"
                    );
                    self.carry = Some(Carry {
                        payload,
                        attempts: 0,
                    });
                    self.halted = halt_on_malformed;
                }
            }
        }
    }

    fn retry_carry(
        &mut self,
        mut carry: Carry,
        continuation: &str,
        out: &mut Vec<DeltaEvent>,
        halt_on_malformed: bool,
    ) {
        // Joined without a newline: a raw newline inside a JSON string is invalid.
        carry.payload.push_str(continuation);
        let candidate = carry.payload.trim();
        if candidate == DONE_TOKEN {
            out.push(DeltaEvent::Done);
            self.finished = true;
            self.lines.clear();
            return;
        }
        match parse_delta_payload(candidate) {
            Ok(Some(text)) => out.push(DeltaEvent::Text(text)),
            Ok(None) => {}
            Err(_) => {
                carry.attempts += 1;
                if carry.attempts >= self.max_frame_retries {
                    tracing::warn!(
                        payload_len = carry.payload.len(),
                        attempts = carry.attempts,
                        "dropping malformed frame after retry limit"
                    );
                    return;
                }
                self.carry = Some(carry);
                self.halted = halt_on_malformed;
            }
        }
    }
}

impl Default for DeltaDecoder {
    fn default() -> Self {
        Self::new(16)
    }
}

struct DeltaStreamState<S> {
    source: std::pin::Pin<Box<S>>,
    decoder: DeltaDecoder,
    decoded: Vec<DeltaEvent>,
    pending: VecDeque<DeltaEvent>,
    terminated: bool,
}

/// Lazily decode a response body into delta events.
///
/// The stream is finite and not restartable: it ends after `[DONE]`, after
/// the source is exhausted, or after yielding the first source error.
pub fn delta_stream<S>(
    byte_stream: S,
    max_frame_retries: u32,
) -> impl Stream<Item = Result<DeltaEvent, ChatError>> + Send
where
    S: Stream<Item = Result<Bytes, ChatError>> + Send + 'static,
{
    use futures_util::StreamExt;

    let state = DeltaStreamState {
        source: Box::pin(byte_stream),
        decoder: DeltaDecoder::new(max_frame_retries),
        decoded: Vec::with_capacity(8),
        pending: VecDeque::with_capacity(8),
        terminated: false,
    };

    futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }
            if state.terminated || state.decoder.is_finished() {
                return None;
            }

            match state.source.as_mut().next().await {
                Some(Ok(chunk)) => {
                    state.decoder.feed_into(&chunk, &mut state.decoded);
                }
                Some(Err(err)) => {
                    state.terminated = true;
                    return Some((Err(err), state));
                }
                None => {
                    state.decoder.finish_into(&mut state.decoded);
                }
            }
            state.pending.extend(state.decoded.drain(..));
        }
    })
}
