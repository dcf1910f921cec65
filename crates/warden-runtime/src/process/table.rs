//! OS process table adapter.
//!
//! Reads the process table through `sysinfo` and delivers termination
//! signals through `nix` (SIGTERM / SIGKILL) on Unix.

use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System, UpdateKind};
use tracing::debug;
use warden_core::{ProcessEntry, ProcessError, ProcessTablePort, TermSignal};

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{self, Signal};

/// Process table backed by `sysinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoProcessTable;

impl SysinfoProcessTable {
    /// Create a new process table adapter.
    pub const fn new() -> Self {
        Self
    }
}

impl ProcessTablePort for SysinfoProcessTable {
    fn snapshot(&self) -> Vec<ProcessEntry> {
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
        );

        system
            .processes()
            .iter()
            // Linux also lists userland threads; they share the parent's cmdline
            .filter(|(_, process)| process.thread_kind().is_none())
            .map(|(pid, process)| {
                let cmdline = process
                    .cmd()
                    .iter()
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .collect();
                ProcessEntry::new(pid.as_u32(), process.start_time(), cmdline)
            })
            .collect()
    }

    fn is_alive(&self, pid: u32) -> bool {
        let pid = Pid::from_u32(pid);
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing(),
        );

        system
            .process(pid)
            .is_some_and(|process| !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead))
    }

    fn signal(&self, pid: u32, signal: TermSignal) -> Result<(), ProcessError> {
        debug!(pid = %pid, ?signal, "Signalling process");
        send_signal(pid, signal)
    }
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: TermSignal) -> Result<(), ProcessError> {
    let raw = i32::try_from(pid).map_err(|_| ProcessError::Signal {
        pid,
        reason: "pid out of range".to_string(),
    })?;
    let sig = match signal {
        TermSignal::Graceful => Signal::SIGTERM,
        TermSignal::Forced => Signal::SIGKILL,
    };

    match signal::kill(nix::unistd::Pid::from_raw(raw), sig) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => Err(ProcessError::NotFound(pid)),
        Err(Errno::EPERM) => Err(ProcessError::PermissionDenied(pid)),
        Err(e) => Err(ProcessError::Signal {
            pid,
            reason: e.to_string(),
        }),
    }
}

#[cfg(not(unix))]
fn send_signal(pid: u32, signal: TermSignal) -> Result<(), ProcessError> {
    // No SIGTERM equivalent - both flavours terminate immediately
    let _ = signal;
    let sys_pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[sys_pid]), true);
    let process = system.process(sys_pid).ok_or(ProcessError::NotFound(pid))?;
    if process.kill() {
        Ok(())
    } else {
        Err(ProcessError::Signal {
            pid,
            reason: "terminate request refused".to_string(),
        })
    }
}
