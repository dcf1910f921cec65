//! Bot API wire types.
//!
//! Only the fields warden reads are modelled; serde ignores the rest.

use serde::Deserialize;
use warden_core::{BotIdentity, ChatId, ChatKind, InboundMessage, UserId};

/// Envelope of every Bot API reply.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl From<User> for BotIdentity {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.first_name,
            username: user.username,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Message {
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

impl Message {
    /// Convert to a domain message; non-text messages and messages from
    /// other bots are dropped.
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let from = self.from.filter(|user| !user.is_bot)?;
        let text = self.text?;
        let chat_kind = if self.chat.kind == "private" {
            ChatKind::Private
        } else {
            ChatKind::Group
        };
        Some(InboundMessage {
            chat: ChatId(self.chat.id),
            chat_kind,
            from: UserId(from.id),
            text,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}
