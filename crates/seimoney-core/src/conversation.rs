//! Conversation state manager
//!
//! Owns the message log, the thinking flag, and the latest payment-link
//! preview. `Conversation` is a cheap handle: clone it into a task to run a
//! send in the background while the view keeps reading `snapshot()`.
//!
//! At most one send is in flight per conversation. A second `send_message`
//! while the first is waiting on the agent fails with `SendError::Busy` and
//! leaves the log untouched.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::{AgentBackend, AgentRequest};
use crate::error::SendError;
use crate::link::LinkExtractor;
use crate::state::{ConversationState, Message, Notice};

/// What an accepted `send_message` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing changed
    Ignored,
    /// The agent replied and the reply was appended
    Replied { preview_updated: bool },
}

pub struct Conversation<B: AgentBackend> {
    backend: Arc<B>,
    extractor: LinkExtractor,
    state: Arc<Mutex<ConversationState>>,
}

impl<B: AgentBackend> Clone for Conversation<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            extractor: self.extractor.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

/// Clears `is_thinking` if a send ends without reaching its normal completion
/// (the future was dropped or the backend panicked).
struct InFlight<'a> {
    state: &'a Mutex<ConversationState>,
    armed: bool,
}

impl InFlight<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.lock().is_thinking = false;
        }
    }
}

impl<B: AgentBackend> Conversation<B> {
    pub fn new(backend: B) -> Self {
        Self::with_extractor(backend, LinkExtractor::default())
    }

    pub fn with_extractor(backend: B, extractor: LinkExtractor) -> Self {
        Self {
            backend: Arc::new(backend),
            extractor,
            state: Arc::new(Mutex::new(ConversationState::default())),
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().messages.clone()
    }

    pub fn is_thinking(&self) -> bool {
        self.state.lock().is_thinking
    }

    pub fn preview(&self) -> Option<String> {
        self.state.lock().preview.clone()
    }

    pub fn notice(&self) -> Option<Notice> {
        self.state.lock().notice.clone()
    }

    pub fn snapshot(&self) -> ConversationState {
        self.state.lock().clone()
    }

    /// Send one message and record the reply.
    ///
    /// Blank input is ignored. On success the raw reply is appended and, if it
    /// carries a payment link, `preview` is replaced. A preview is never cleared.
    /// On failure no agent message is appended and `notice` describes the error.
    pub async fn send_message(&self, request: AgentRequest) -> Result<SendOutcome, SendError> {
        if request.input.trim().is_empty() {
            return Ok(SendOutcome::Ignored);
        }

        let in_flight = self.begin(&request.input)?;
        let result = self.backend.send(request).await;

        let mut state = self.state.lock();
        state.is_thinking = false;
        in_flight.disarm();

        match result {
            Ok(text) => {
                let link = self.extractor.extract(&text);
                let preview_updated = link.is_some();
                if let Some(link) = link {
                    debug!(%link, "preview updated");
                    state.preview = Some(link);
                }
                state.messages.push(Message::agent(text));
                Ok(SendOutcome::Replied { preview_updated })
            }
            Err(err) => {
                state.notice = Some(Notice::from(&err));
                Err(SendError::Agent(err))
            }
        }
    }

    fn begin(&self, input: &str) -> Result<InFlight<'_>, SendError> {
        let mut state = self.state.lock();
        if state.is_thinking {
            warn!("rejected send: a message is already in flight");
            return Err(SendError::Busy);
        }

        state.messages.push(Message::user(input));
        state.is_thinking = true;
        state.notice = None;
        info!(messages = state.messages.len(), "message sent");

        Ok(InFlight {
            state: &self.state,
            armed: true,
        })
    }
}
