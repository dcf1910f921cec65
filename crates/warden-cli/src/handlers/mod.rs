//! Chat command handlers.
//!
//! Handlers follow one pattern:
//! - Signature: `pub async fn <name>(ctx: &AppContext, ...) -> Reply`
//! - Thin wrappers that call the runtime and format the outcome
//! - Every path produces a reply; errors are rendered, never propagated
//!
//! [`Dispatcher`] owns authorization and routing.

pub mod lifecycle;
pub mod logs;
pub mod system;
pub mod users;

use std::sync::Arc;

use tracing::{debug, warn};
use warden_core::{ChatId, ChatKind, ControlError, ErrorKind, InboundMessage};
use warden_runtime::Role;

use crate::bootstrap::AppContext;
use crate::commands::{ChatCommand, HELP_TEXT};

/// What a handler sends back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Document {
        file_name: String,
        content: Vec<u8>,
        caption: String,
    },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// Render a failed operation by its error kind.
pub fn describe_error(err: &ControlError) -> String {
    match (err.kind(), err) {
        (ErrorKind::Declined, ControlError::Declined(reason)) => format!("Not done: {reason}"),
        (ErrorKind::Transient, _) => format!("Temporary failure, try again later: {err}"),
        (ErrorKind::Process, _) => format!("Failed: {err}"),
        _ => format!("Unexpected failure: {err}"),
    }
}

/// Routes inbound messages to handlers after checking access.
pub struct Dispatcher {
    ctx: Arc<AppContext>,
}

impl Dispatcher {
    pub const fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// Compute the reply for one message; `None` means stay silent.
    ///
    /// Strangers and plain text are ignored. Known users asking for an
    /// owner-only command are told access is denied.
    pub async fn handle(&self, message: &InboundMessage) -> Option<Reply> {
        let role = self.ctx.access.role(message.from);
        if role == Role::Stranger {
            debug!(user = %message.from, "Ignoring message from unauthorized user");
            return None;
        }

        let command = match ChatCommand::parse(&message.text)? {
            Ok(command) => command,
            Err(e) => return Some(Reply::text(e.to_string())),
        };
        if command.owner_only() && role != Role::Owner {
            return Some(Reply::text("Access denied"));
        }
        if command.private_only() && message.chat_kind != ChatKind::Private {
            return Some(Reply::text("This command only works in a private chat"));
        }

        debug!(user = %message.from, ?command, "Dispatching command");
        Some(self.route(command, message.chat).await)
    }

    async fn route(&self, command: ChatCommand, chat: ChatId) -> Reply {
        let ctx = self.ctx.as_ref();
        match command {
            ChatCommand::Help => Reply::text(HELP_TEXT),
            ChatCommand::StartProcess { alternate_route } => {
                lifecycle::start(ctx, alternate_route).await
            }
            ChatCommand::StopProcess => lifecycle::stop(ctx).await,
            ChatCommand::RestartProcess { alternate_route } => {
                lifecycle::restart(ctx, alternate_route).await
            }
            ChatCommand::Status => lifecycle::status(ctx),
            ChatCommand::ProcessUptime => lifecycle::uptime(ctx),
            ChatCommand::SystemUptime => system::uptime(),
            ChatCommand::Info => system::info().await,
            ChatCommand::Ram => system::ram().await,
            ChatCommand::Cpu => system::cpu().await,
            ChatCommand::Disk => system::disk().await,
            ChatCommand::Ping { host } => system::ping(ctx, host.as_deref()).await,
            ChatCommand::Terminal(command) => system::terminal(ctx, command).await,
            ChatCommand::Diagnose => system::diagnose(ctx).await,
            ChatCommand::InstallRequirements => system::install_requirements(ctx).await,
            ChatCommand::Update => system::update(ctx).await,
            ChatCommand::Logs { level } => logs::export(ctx, &level).await,
            ChatCommand::DebugOn => logs::debug_on(ctx, chat),
            ChatCommand::DebugOff => logs::debug_off(ctx, chat),
            ChatCommand::AddUser(user) => users::add(ctx, user),
            ChatCommand::RemoveUser(user) => users::remove(ctx, user),
            ChatCommand::ListUsers => users::list(ctx),
        }
    }

    /// Handle a message and deliver the reply to its chat.
    pub async fn serve(&self, message: InboundMessage) {
        let Some(reply) = self.handle(&message).await else {
            return;
        };
        let result = match reply {
            Reply::Text(text) => self.ctx.sender.send_text(message.chat, &text).await,
            Reply::Document {
                file_name,
                content,
                caption,
            } => {
                self.ctx
                    .sender
                    .send_document(message.chat, &file_name, content, &caption)
                    .await
            }
        };
        if let Err(e) = result {
            warn!(chat = %message.chat, error = %e, "Failed to deliver reply");
        }
    }
}
