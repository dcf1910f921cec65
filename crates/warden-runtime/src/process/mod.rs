//! Managed-process infrastructure.
//!
//! # Structure
//!
//! - `ProcessMatcher` - identifies managed processes in the OS process table
//! - `SysinfoProcessTable` - process table and signal adapter (sysinfo + nix)
//! - `ShellLauncher` - fire-and-forget shell spawn with drained output
//! - `LifecycleController` - start/stop/restart/status and the log tailer slot

mod launcher;
mod lifecycle;
mod matcher;
mod stream;
mod table;

pub use launcher::ShellLauncher;
pub use lifecycle::{LifecycleController, TailerSlot};
pub use matcher::ProcessMatcher;
pub use table::SysinfoProcessTable;
