//! UI-agnostic conversation state types
//!
//! These are shared by every front end and don't depend on any specific UI
//! framework.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AgentError;
use crate::sanitize::strip_terminal_controls;

/// A single entry in the conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Agent,
        }
    }
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Network,
    Status,
    MalformedBody,
    InvalidRequest,
}

/// Why the last send produced no reply. Rendered apart from the messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub detail: String,
}

impl From<&AgentError> for Notice {
    fn from(err: &AgentError) -> Self {
        let kind = match err {
            AgentError::Transport(_) => NoticeKind::Network,
            AgentError::Status { .. } => NoticeKind::Status,
            AgentError::MalformedBody(_) => NoticeKind::MalformedBody,
            AgentError::InvalidRequest(_) => NoticeKind::InvalidRequest,
        };
        Self {
            kind,
            detail: strip_terminal_controls(&err.to_string()),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            NoticeKind::Network => "Network error",
            NoticeKind::Status => "Agent error",
            NoticeKind::MalformedBody => "Unreadable reply",
            NoticeKind::InvalidRequest => "Not sent",
        };
        write!(f, "{}: {}", prefix, self.detail)
    }
}

/// Everything a view needs to draw the conversation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub is_thinking: bool,
    pub preview: Option<String>,
    pub notice: Option<Notice>,
}
