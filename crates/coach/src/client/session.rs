use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::decoder::Utf8StreamDecoder;
use super::transport::RelayTransport;
use crate::errors::TransportError;
use crate::models::message::{Conversation, Message};

/// Shown in place of the reply whenever the relay cannot be reached or fails.
pub const FALLBACK_REPLY: &str = "Sorry, something went wrong. Please try again.";

/// Everything a view needs to render the chat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSnapshot {
    pub messages: Conversation,
    pub is_streaming: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Input was empty after trimming.
    Empty,
    /// A reply is already streaming.
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Completed,
    /// The reply was replaced with [`FALLBACK_REPLY`].
    Failed,
    /// Stopped by the caller; the partial reply is kept.
    Cancelled,
    Ignored(IgnoreReason),
}

/// Clears the streaming flag however `send_with_cancel` exits. When the future is
/// dropped before it settles, an empty placeholder gets the fallback text.
struct StreamingGuard<'a> {
    state: &'a watch::Sender<ChatSnapshot>,
    settled: bool,
}

impl<'a> StreamingGuard<'a> {
    fn new(state: &'a watch::Sender<ChatSnapshot>) -> Self {
        Self {
            state,
            settled: false,
        }
    }

    fn settle(&mut self) {
        self.settled = true;
    }
}

impl Drop for StreamingGuard<'_> {
    fn drop(&mut self) {
        let abandoned = !self.settled;
        if abandoned {
            tracing::warn!("reply abandoned before it finished");
        }
        self.state.send_modify(|state| {
            state.is_streaming = false;
            if !abandoned {
                return;
            }
            if let Some(last) = state
                .messages
                .last_mut()
                .filter(|m| m.is_assistant() && m.content.is_empty())
            {
                last.content = FALLBACK_REPLY.to_string();
            }
        });
    }
}

/// A single conversation with the relay.
///
/// State lives in a `watch` channel so views can subscribe to every change. The
/// in-flight check and the placeholder insertion happen under the channel's lock,
/// which keeps at most one reply streaming at a time.
pub struct ChatSession<T> {
    transport: T,
    state: watch::Sender<ChatSnapshot>,
}

impl<T: RelayTransport> ChatSession<T> {
    pub fn new(transport: T) -> Self {
        let (state, _) = watch::channel(ChatSnapshot::default());
        Self { transport, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        self.state.borrow().clone()
    }

    pub fn is_streaming(&self) -> bool {
        self.state.borrow().is_streaming
    }

    pub async fn send(&self, input: &str) -> SendOutcome {
        self.send_with_cancel(input, CancellationToken::new()).await
    }

    /// Submit `input` and stream the reply into a new assistant message.
    pub async fn send_with_cancel(&self, input: &str, cancel: CancellationToken) -> SendOutcome {
        let text = input.trim();
        if text.is_empty() {
            return SendOutcome::Ignored(IgnoreReason::Empty);
        }

        let mut request = None;
        self.state.send_if_modified(|state| {
            if state.is_streaming {
                return false;
            }
            state.messages.push(Message::user(text));
            request = Some(state.messages.clone());
            state.messages.push(Message::assistant(""));
            state.is_streaming = true;
            true
        });
        let Some(request) = request else {
            return SendOutcome::Ignored(IgnoreReason::Busy);
        };
        let mut guard = StreamingGuard::new(&self.state);

        let outcome = tokio::select! {
            result = self.stream_reply(&request) => match result {
                Ok(()) => SendOutcome::Completed,
                Err(err) => {
                    tracing::error!(error = %err, "chat relay failed");
                    self.set_reply(FALLBACK_REPLY.to_string());
                    SendOutcome::Failed
                }
            },
            _ = cancel.cancelled() => {
                tracing::info!("reply cancelled");
                SendOutcome::Cancelled
            }
        };

        guard.settle();
        outcome
    }

    async fn stream_reply(&self, request: &[Message]) -> Result<(), TransportError> {
        let mut body = self.transport.open(request).await?;
        let mut decoder = Utf8StreamDecoder::new();
        let mut accumulated = String::new();

        while let Some(chunk) = body.next().await {
            accumulated.push_str(&decoder.decode(&chunk?));
            self.set_reply(accumulated.clone());
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            accumulated.push_str(&tail);
            self.set_reply(accumulated);
        }
        Ok(())
    }

    /// Replace the trailing assistant message's content.
    fn set_reply(&self, content: String) {
        self.state.send_modify(|state| {
            if let Some(last) = state.messages.last_mut().filter(|m| m.is_assistant()) {
                last.content = content;
            }
        });
    }
}
