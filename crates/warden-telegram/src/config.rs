//! Public configuration for the Telegram control channel.

use std::fmt;
use std::time::Duration;

/// Configuration for the Telegram bot client.
///
/// # Example
///
/// ```
/// use warden_telegram::TelegramConfig;
/// use std::time::Duration;
///
/// let config = TelegramConfig::new("123:abc")
///     .with_poll_timeout(Duration::from_secs(50))
///     .with_max_retries(5);
/// assert_eq!(config.poll_timeout(), Duration::from_secs(50));
/// ```
#[derive(Clone)]
pub struct TelegramConfig {
    pub(crate) token: String,
    pub(crate) base_url: String,
    /// Timeout of ordinary requests.
    pub(crate) timeout: Duration,
    /// Server-side wait of one `getUpdates` long poll.
    pub(crate) poll_timeout: Duration,
    /// Pause after a failed long poll.
    pub(crate) poll_error_backoff: Duration,
    pub(crate) max_retries: u8,
    pub(crate) retry_base_delay: Duration,
}

impl TelegramConfig {
    /// Create a configuration for the given bot token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: "https://api.telegram.org".to_string(),
            timeout: Duration::from_secs(30),
            poll_timeout: Duration::from_secs(25),
            poll_error_backoff: Duration::from_secs(5),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }

    /// Set the Bot API base URL.
    ///
    /// Defaults to `https://api.telegram.org`.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the timeout of ordinary requests.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how long one long poll may wait on the server side.
    #[must_use]
    pub const fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the pause after a failed long poll.
    #[must_use]
    pub const fn with_poll_error_backoff(mut self, backoff: Duration) -> Self {
        self.poll_error_backoff = backoff;
        self
    }

    /// Set the maximum number of retries for network errors and 5xx replies.
    ///
    /// Defaults to 3 retries.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the base delay for exponential backoff retries.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    pub const fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    pub const fn max_retries(&self) -> u8 {
        self.max_retries
    }
}

// The token grants full control of the bot, keep it out of logs.
impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("poll_timeout", &self.poll_timeout)
            .field("poll_error_backoff", &self.poll_error_backoff)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .finish()
    }
}
