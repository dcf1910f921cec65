//! Telegram Bot API adapter for the warden control channel.
//!
//! [`TelegramBot`] implements both chat ports from `warden-core`: outbound
//! text and document delivery, the `getMe` identity round trip used as a
//! health probe, and long-polling for inbound commands.

#![deny(unsafe_code)]

mod client;
mod config;
mod error;
mod models;
mod transport;

// ============================================================================
// Public API
// ============================================================================

pub use client::{DefaultTelegramBot, TelegramBot};
pub use config::TelegramConfig;
pub use error::{TelegramError, TelegramResult};
pub use transport::{BotTransport, FileUpload, ReqwestTransport};
