//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the runtime expects from the OS and from
//! the control channel. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No `sysinfo`, `nix` or `reqwest` types in any signature
//! - Process ports are synchronous (process table reads and signals do not block)
//! - Chat ports are async and must be safe to call from many tasks at once

pub mod chat;
pub mod process;

pub use chat::{ChatConnectionPort, ChatError, ChatSenderPort};
pub use process::{LaunchSpec, ProcessError, ProcessLauncherPort, ProcessTablePort, TermSignal};
