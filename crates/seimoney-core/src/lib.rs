pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod link;
pub mod sanitize;
pub mod state;
pub mod wallet;

// Re-export main types for convenience
pub use client::{AgentBackend, AgentClient, AgentRequest, Attachment};
pub use config::Config;
pub use conversation::{Conversation, SendOutcome};
pub use error::{AgentError, AttachmentError, ConfigError, SendError, WalletError};
pub use link::{extract_payment_link, LinkExtractor, DEFAULT_LINK_DOMAIN};
pub use state::{ConversationState, Message, Notice, NoticeKind, Sender};
pub use wallet::{ThreadId, WalletAddress, WalletConfig, WalletPayload, WalletSession};
