//! Chat session state machine.
//!
//! A [`ChatSession`] owns one conversation and drives at most one
//! request/response cycle at a time. Observers call
//! [`ChatSession::subscribe`] and re-read [`ChatSession::messages`] whenever
//! the published [`SessionView`] changes; every folded delta bumps the
//! revision.

pub mod message;

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::bots::model::{Bot, BotType};
use crate::config::ChatConfig;
use crate::error::{ChatError, Notice};
use crate::observability::{self, CycleStats};
use crate::protocol::{decode_image_response, ChatRequest};
use crate::stream::{delta_stream, DeltaEvent};
use crate::transport::{with_idle_timeout, ByteStream, ChatTransport, ResponseBody};

pub use message::{ConversationLog, Message, Role};

/// Lifecycle of the current cycle. `Done` and `Failed` are published briefly
/// before the session settles back to `Idle`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Sending,
    Streaming,
    Done,
    Failed,
}

impl Phase {
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Phase::Sending | Phase::Streaming)
    }
}

/// Snapshot published to subscribers after every state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionView {
    pub revision: u64,
    pub phase: Phase,
    pub loading: bool,
    pub message_count: usize,
}

/// Inputs for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleRequest {
    pub utterance: String,
    pub system_prompt: String,
    pub model: String,
    pub bot_type: BotType,
}

impl CycleRequest {
    /// Build a cycle for `bot`, falling back to `default_system_prompt` when
    /// the bot has none.
    #[must_use]
    pub fn for_bot(bot: &Bot, utterance: impl Into<String>, default_system_prompt: &str) -> Self {
        Self {
            utterance: utterance.into(),
            system_prompt: bot.system_prompt_or(default_system_prompt).to_string(),
            model: bot.model.clone(),
            bot_type: bot.bot_type,
        }
    }
}

/// How a cycle ended. Failures are values, never panics or `Err`.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Completed {
        assistant_appended: bool,
        deltas: u64,
    },
    Failed(ChatError),
    /// Another cycle was active; nothing was changed.
    Rejected,
    /// The session was reset while this cycle was in flight.
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub max_frame_retries: u32,
    pub stream_idle_timeout: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_frame_retries: 16,
            stream_idle_timeout: None,
        }
    }
}

impl From<&ChatConfig> for SessionOptions {
    fn from(config: &ChatConfig) -> Self {
        Self {
            max_frame_retries: config.max_frame_retries,
            stream_idle_timeout: config.stream_idle_timeout(),
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    log: ConversationLog,
    phase: Phase,
    epoch: u64,
    revision: u64,
    last_notice: Option<Notice>,
}

struct SessionInner<T> {
    transport: T,
    options: SessionOptions,
    state: Mutex<SessionState>,
    view_tx: watch::Sender<SessionView>,
    epoch_tx: watch::Sender<u64>,
}

impl<T> SessionInner<T> {
    /// Bump the revision and publish the current view. Called with the state
    /// lock held so views are published in order.
    fn publish(&self, state: &mut SessionState) {
        state.revision += 1;
        self.view_tx.send_replace(SessionView {
            revision: state.revision,
            phase: state.phase,
            loading: state.phase.is_active(),
            message_count: state.log.len(),
        });
    }

    fn set_phase(&self, state: &mut SessionState, phase: Phase) {
        state.phase = phase;
        self.publish(state);
    }

    /// Settle a cycle through `terminal` back to `Idle`.
    fn settle(&self, state: &mut SessionState, terminal: Phase) {
        state.log.finish_stream();
        self.set_phase(state, terminal);
        self.set_phase(state, Phase::Idle);
    }
}

/// Cloneable handle to one conversation.
pub struct ChatSession<T> {
    inner: Arc<SessionInner<T>>,
}

impl<T> Clone for ChatSession<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Clears the loading state if a cycle future is dropped mid-flight.
struct CycleGuard<'a, T> {
    inner: &'a SessionInner<T>,
    epoch: u64,
    armed: bool,
}

impl<T> CycleGuard<'_, T> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<T> Drop for CycleGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.inner.state.lock();
        if state.epoch == self.epoch && state.phase.is_active() {
            tracing::debug!("chat cycle dropped before completion");
            state.log.finish_stream();
            self.inner.set_phase(&mut state, Phase::Idle);
        }
    }
}

impl<T: ChatTransport> ChatSession<T> {
    #[must_use]
    pub fn new(transport: T, options: SessionOptions) -> Self {
        let (view_tx, _) = watch::channel(SessionView {
            revision: 0,
            phase: Phase::Idle,
            loading: false,
            message_count: 0,
        });
        let (epoch_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(SessionInner {
                transport,
                options,
                state: Mutex::new(SessionState::default()),
                view_tx,
                epoch_tx,
            }),
        }
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Copy of the conversation log.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.inner.state.lock().log.messages().to_vec()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.state.lock().phase
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase().is_active()
    }

    /// Notice for the most recent failed cycle, cleared when a new cycle starts.
    #[must_use]
    pub fn last_notice(&self) -> Option<Notice> {
        self.inner.state.lock().last_notice.clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.inner.view_tx.subscribe()
    }

    /// Clear the conversation and return to `Idle`.
    ///
    /// An in-flight cycle stops folding deltas and resolves to
    /// [`CycleOutcome::Cancelled`].
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        state.log.clear();
        state.epoch += 1;
        state.last_notice = None;
        // Signal under the lock so a cycle started right after this reset
        // never observes the bump.
        self.inner.epoch_tx.send_replace(state.epoch);
        tracing::debug!(epoch = state.epoch, "chat session reset");
        self.inner.set_phase(&mut state, Phase::Idle);
    }

    /// Run one request/response cycle.
    ///
    /// The user message is appended before the request goes out and is kept
    /// whatever the outcome.
    pub async fn send(&self, request: CycleRequest) -> CycleOutcome {
        let inner = &*self.inner;
        let (epoch, wire_request, mut epoch_rx) = {
            let mut state = inner.state.lock();
            if state.phase.is_active() {
                tracing::debug!("rejecting send while a cycle is active");
                return CycleOutcome::Rejected;
            }
            state.log.push_user(request.utterance);
            state.last_notice = None;
            let wire_request = ChatRequest::from_log(
                state.log.messages(),
                request.system_prompt,
                request.model,
                request.bot_type,
            );
            inner.set_phase(&mut state, Phase::Sending);
            (state.epoch, wire_request, inner.epoch_tx.subscribe())
        };
        let guard = CycleGuard {
            inner,
            epoch,
            armed: true,
        };

        tracing::debug!(
            model = %wire_request.model,
            bot_type = %wire_request.bot_type,
            messages = wire_request.messages.len(),
            "sending chat request"
        );

        let outcome = tokio::select! {
            biased;
            _ = epoch_rx.changed() => {
                guard.disarm();
                return CycleOutcome::Cancelled;
            }
            outcome = inner.transport.send(&wire_request) => outcome,
        };

        let result = match outcome.into_result() {
            Ok(ResponseBody::Json(body)) => self.finish_single_shot(epoch, &body),
            Ok(ResponseBody::Stream(body)) => {
                self.consume_stream(epoch, &wire_request.model, body, &mut epoch_rx)
                    .await
            }
            Err(err) => self.fail(epoch, err),
        };
        guard.disarm();
        result
    }

    fn finish_single_shot(&self, epoch: u64, body: &[u8]) -> CycleOutcome {
        let reply = match decode_image_response(body) {
            Ok(reply) => reply,
            Err(err) => return self.fail(epoch, err),
        };
        let mut state = self.inner.state.lock();
        if state.epoch != epoch {
            return CycleOutcome::Cancelled;
        }
        tracing::debug!(has_image = reply.image_url.is_some(), "image reply received");
        state
            .log
            .push_assistant(Message::assistant_with_image(reply.caption, reply.image_url));
        self.inner.settle(&mut state, Phase::Done);
        CycleOutcome::Completed {
            assistant_appended: true,
            deltas: 0,
        }
    }

    async fn consume_stream(
        &self,
        epoch: u64,
        model: &str,
        body: ByteStream,
        epoch_rx: &mut watch::Receiver<u64>,
    ) -> CycleOutcome {
        let inner = &*self.inner;
        {
            let mut state = inner.state.lock();
            if state.epoch != epoch {
                return CycleOutcome::Cancelled;
            }
            inner.set_phase(&mut state, Phase::Streaming);
        }

        let body = match inner.options.stream_idle_timeout {
            Some(idle) => with_idle_timeout(body, idle),
            None => body,
        };
        let mut deltas = std::pin::pin!(delta_stream(body, inner.options.max_frame_retries));
        let started = Instant::now();
        let mut stats = CycleStats::default();

        loop {
            let event = tokio::select! {
                biased;
                _ = epoch_rx.changed() => return CycleOutcome::Cancelled,
                event = deltas.next() => event,
            };
            match event {
                Some(Ok(DeltaEvent::Text(text))) => {
                    let mut state = inner.state.lock();
                    if state.epoch != epoch {
                        return CycleOutcome::Cancelled;
                    }
                    state.log.append_delta(&text);
                    stats.record(&text);
                    inner.publish(&mut state);
                }
                Some(Ok(DeltaEvent::Done)) | None => break,
                Some(Err(err)) => return self.fail(epoch, err),
            }
        }

        {
            let mut state = inner.state.lock();
            if state.epoch != epoch {
                return CycleOutcome::Cancelled;
            }
            inner.settle(&mut state, Phase::Done);
        }
        observability::log_cycle_complete(model, &stats, started);
        CycleOutcome::Completed {
            assistant_appended: stats.deltas > 0,
            deltas: stats.deltas,
        }
    }

    fn fail(&self, epoch: u64, err: ChatError) -> CycleOutcome {
        let mut state = self.inner.state.lock();
        if state.epoch != epoch {
            return CycleOutcome::Cancelled;
        }
        tracing::warn!(error = %err, kind = ?err.kind(), "chat cycle failed");
        state.last_notice = Some(err.notice());
        self.inner.settle(&mut state, Phase::Failed);
        CycleOutcome::Failed(err)
    }
}
