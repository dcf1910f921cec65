//! Domain types shared by every warden crate.

mod chat;
mod lifecycle;
mod process;

pub use chat::{BotIdentity, ChatId, ChatKind, InboundMessage, UserId};
pub use lifecycle::{RestartReport, StartReport, StatusReport, StopMode, StopOutcome};
pub use process::{ManagedProcess, ProcessEntry};
