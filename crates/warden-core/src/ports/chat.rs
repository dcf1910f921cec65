//! Control-channel ports.
//!
//! The control channel is split in two: [`ChatSenderPort`] is all that log
//! broadcasting and command replies need, while [`ChatConnectionPort`] is the
//! surface the watchdog and polling supervisor drive.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{BotIdentity, ChatId};

/// Errors from the control channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatError {
    /// Connection-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete in time.
    #[error("Request timed out")]
    Timeout,

    /// The platform rejected the request.
    #[error("API error {code}: {description}")]
    Api { code: u16, description: String },

    /// `stop_listening` was called while not listening.
    #[error("Not listening")]
    NotListening,

    /// `start_listening` was called while already listening.
    #[error("Already listening")]
    AlreadyListening,

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// Whether retrying later may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Api { code, .. } => *code == 429 || *code >= 500,
            Self::NotListening | Self::AlreadyListening | Self::Internal(_) => false,
        }
    }
}

/// Port for delivering messages to chats.
#[async_trait]
pub trait ChatSenderPort: Send + Sync {
    /// Send a text message.
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), ChatError>;

    /// Send a file as a downloadable document.
    async fn send_document(
        &self,
        chat: ChatId,
        file_name: &str,
        content: Vec<u8>,
        caption: &str,
    ) -> Result<(), ChatError>;
}

/// Port for the connection lifecycle of the control channel.
#[async_trait]
pub trait ChatConnectionPort: Send + Sync {
    /// Lightweight identity round trip used as a health probe.
    async fn whoami(&self) -> Result<BotIdentity, ChatError>;

    /// (Re)initialise the client: drop pooled connections and validate credentials.
    async fn initialize(&self) -> Result<(), ChatError>;

    /// Start receiving inbound events.
    async fn start_listening(&self) -> Result<(), ChatError>;

    /// Stop receiving inbound events.
    ///
    /// Returns [`ChatError::NotListening`] when not listening.
    async fn stop_listening(&self) -> Result<(), ChatError>;
}
