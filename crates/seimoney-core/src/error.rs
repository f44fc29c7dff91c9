//! Error types for the agent client, conversation, and wallet boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the agent client.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The request never produced a response (DNS, connect, reset, ...).
    #[error("could not reach the agent: {0}")]
    Transport(#[from] reqwest::Error),

    /// The agent answered with anything other than 200.
    #[error("agent returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, kept for the log.
        body: String,
    },

    /// The agent answered 200 but the body could not be read as text.
    #[error("agent returned a malformed body: {0}")]
    MalformedBody(String),

    /// The request could not be built, so nothing was sent.
    #[error("could not build the request: {0}")]
    InvalidRequest(String),
}

/// Errors returned by `Conversation::send_message`.
#[derive(Error, Debug)]
pub enum SendError {
    /// Another message is still waiting on the agent.
    #[error("a message is already in flight")]
    Busy,

    #[error(transparent)]
    Agent(#[from] AgentError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("connect your wallet first")]
    NotConnected,
}

/// Errors raised while reading a file to attach.
#[derive(Error, Debug)]
pub enum AttachmentError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0:?} is not a regular file")]
    NotAFile(PathBuf),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("config I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
