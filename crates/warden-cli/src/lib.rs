//! Chat-controlled supervisor for a long-running bot process.
//!
//! The binary parses [`Cli`], resolves a [`WardenConfig`], composes every
//! component in [`bootstrap`] and then feeds inbound chat messages to the
//! [`Dispatcher`].

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tokio_test as _;

// Used by main.rs only
use anyhow as _;
use dotenvy as _;
use tracing_subscriber as _;

// Used by the test doubles only
use async_trait as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod startup;

#[cfg(test)]
mod test_support;

pub use bootstrap::{AppContext, Warden, WardenConfig, bootstrap};
pub use commands::{ChatCommand, CommandError};
pub use error::CliError;
pub use handlers::{Dispatcher, Reply};
pub use parser::Cli;
pub use startup::notify_startup;
