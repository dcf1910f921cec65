//! Process runtime for warden.
//!
//! This crate owns everything with state-machine or concurrency properties:
//!
//! - [`process`] - managed-process matching, launching and the lifecycle controller
//! - [`logs`] - incremental log tailing and level-filtered log export
//! - [`broadcast`] - observer registry and the batching debug broadcaster
//! - [`watchdog`] - control-channel probing, supervised restart and reconnect backoff
//!
//! plus the smaller host-facing helpers (host metrics, allow-listed terminal
//! commands, diagnostics, access control and the persistent state store).

#![deny(unsafe_code)]

pub mod access;
pub mod broadcast;
pub mod config;
pub mod diagnostics;
pub mod host;
pub mod logs;
pub mod process;
pub mod state;
pub mod terminal;
pub mod text;
pub mod watchdog;

#[cfg(test)]
mod test_support;

pub use access::{AccessList, Role};
pub use broadcast::{DebugBroadcaster, FlushReport, ObserverRegistry};
pub use config::TargetConfig;
pub use diagnostics::{Diagnostics, diagnose, resolve_interpreter};
pub use host::{HostSnapshot, collect_host_snapshot, system_uptime};
pub use logs::{ALL_LEVELS, LogCursor, LogExport, LogTailer, TailerExit, export_logs};
pub use process::{
    LifecycleController, ProcessMatcher, ShellLauncher, SysinfoProcessTable, TailerSlot,
};
pub use state::{PersistedState, StateStore};
pub use terminal::{
    CommandOutput, DEFAULT_PING_HOST, PingReport, TerminalCommand, TerminalRunner,
};
pub use watchdog::{
    Backoff, ConnectionWatchdog, PollingSupervisor, ReconnectState, RestartAttempt,
    RestartGuard, SupervisorError,
};
