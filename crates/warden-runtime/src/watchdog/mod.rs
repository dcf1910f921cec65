//! Control-channel supervision.
//!
//! Two loops keep the control channel alive:
//!
//! - [`PollingSupervisor`] wraps the initial listen in an exponential
//!   backoff retry loop and starts the watchdog on first success
//! - [`ConnectionWatchdog`] probes the channel at a fixed interval and
//!   restarts it after consecutive failures
//!
//! Both share one [`ReconnectState`].

mod backoff;
mod probe;
mod state;
mod supervisor;

pub use backoff::Backoff;
pub use probe::{ConnectionWatchdog, RestartAttempt};
pub use state::{ReconnectState, RestartGuard};
pub use supervisor::{PollingSupervisor, SupervisorError};
