//! Core domain types and port definitions for warden.
//!
//! This crate holds no process, filesystem-watching or network code. It defines
//! the vocabulary (managed processes, lifecycle outcomes, chat identifiers),
//! the tagged error taxonomy, the timing settings, and the ports that the
//! runtime and adapter crates implement.

pub mod domain;
pub mod error;
pub mod paths;
pub mod ports;
pub mod settings;

pub use domain::{
    BotIdentity, ChatId, ChatKind, InboundMessage, ManagedProcess, ProcessEntry, RestartReport,
    StartReport, StatusReport, StopMode, StopOutcome, UserId,
};
pub use error::{ControlError, ControlResult, DeclineReason, ErrorKind};
pub use paths::{PathError, default_workdir, home_dir};
pub use ports::{
    ChatConnectionPort, ChatError, ChatSenderPort, LaunchSpec, ProcessError,
    ProcessLauncherPort, ProcessTablePort, TermSignal,
};
pub use settings::{Settings, SettingsError, validate_settings};
