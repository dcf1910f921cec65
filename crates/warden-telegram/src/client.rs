//! Telegram bot implementing the control-channel ports.
//!
//! Outbound calls map directly onto Bot API methods. Inbound messages are
//! received by a long-polling task started with `start_listening`; each
//! text message is forwarded to the channel handed to the constructor.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use warden_core::{
    BotIdentity, ChatConnectionPort, ChatError, ChatId, ChatSenderPort, InboundMessage,
};

use crate::config::TelegramConfig;
use crate::error::TelegramResult;
use crate::models::{Update, User};
use crate::transport::{BotTransport, FileUpload, ReqwestTransport};

/// Bot client backed by the reqwest transport.
pub type DefaultTelegramBot = TelegramBot<ReqwestTransport>;

struct Listener {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

/// Telegram bot generic over its transport.
pub struct TelegramBot<T: BotTransport> {
    transport: Arc<T>,
    timeout: Duration,
    poll_timeout: Duration,
    poll_error_backoff: Duration,
    offset: Arc<AtomicI64>,
    inbound: mpsc::Sender<InboundMessage>,
    listener: Mutex<Option<Listener>>,
}

impl DefaultTelegramBot {
    /// Create a bot talking to the real Bot API.
    pub fn new(
        config: &TelegramConfig,
        inbound: mpsc::Sender<InboundMessage>,
    ) -> TelegramResult<Self> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::with_transport(transport, config, inbound))
    }
}

impl<T: BotTransport + 'static> TelegramBot<T> {
    /// Create a bot with a custom transport.
    pub fn with_transport(
        transport: T,
        config: &TelegramConfig,
        inbound: mpsc::Sender<InboundMessage>,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            timeout: config.timeout,
            poll_timeout: config.poll_timeout,
            poll_error_backoff: config.poll_error_backoff,
            offset: Arc::new(AtomicI64::new(0)),
            inbound,
            listener: Mutex::new(None),
        }
    }

    /// Whether the long-polling task is alive.
    pub fn is_listening(&self) -> bool {
        self.lock_listener()
            .as_ref()
            .is_some_and(|listener| !listener.join.is_finished())
    }

    fn lock_listener(&self) -> std::sync::MutexGuard<'_, Option<Listener>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn get_me(&self) -> TelegramResult<User> {
        let value = self.transport.call("getMe", json!({}), self.timeout).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl<T: BotTransport + 'static> ChatSenderPort for TelegramBot<T> {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), ChatError> {
        let params = json!({ "chat_id": chat.0, "text": text });
        self.transport
            .call("sendMessage", params, self.timeout)
            .await?;
        Ok(())
    }

    async fn send_document(
        &self,
        chat: ChatId,
        file_name: &str,
        content: Vec<u8>,
        caption: &str,
    ) -> Result<(), ChatError> {
        let fields = vec![
            ("chat_id".to_string(), chat.0.to_string()),
            ("caption".to_string(), caption.to_string()),
        ];
        let file = FileUpload {
            field: "document".to_string(),
            file_name: file_name.to_string(),
            content,
        };
        self.transport.upload("sendDocument", fields, file).await?;
        Ok(())
    }
}

#[async_trait]
impl<T: BotTransport + 'static> ChatConnectionPort for TelegramBot<T> {
    async fn whoami(&self) -> Result<BotIdentity, ChatError> {
        Ok(self.get_me().await?.into())
    }

    async fn initialize(&self) -> Result<(), ChatError> {
        self.transport.reset().await?;
        let me = self.get_me().await?;
        debug!(bot_id = me.id, "Bot credentials validated");
        Ok(())
    }

    async fn start_listening(&self) -> Result<(), ChatError> {
        let mut slot = self.lock_listener();
        if slot
            .as_ref()
            .is_some_and(|listener| !listener.join.is_finished())
        {
            return Err(ChatError::AlreadyListening);
        }

        let cancel = CancellationToken::new();
        let poller = Poller {
            transport: Arc::clone(&self.transport),
            offset: Arc::clone(&self.offset),
            inbound: self.inbound.clone(),
            poll_timeout: self.poll_timeout,
            request_timeout: self.timeout,
            error_backoff: self.poll_error_backoff,
        };
        let join = tokio::spawn(poller.run(cancel.clone()));
        *slot = Some(Listener { cancel, join });

        info!("Listening for inbound messages");
        Ok(())
    }

    async fn stop_listening(&self) -> Result<(), ChatError> {
        let listener = self.lock_listener().take().ok_or(ChatError::NotListening)?;
        listener.cancel.cancel();
        if let Err(e) = listener.join.await {
            warn!(error = %e, "Long-polling task ended abnormally");
        }
        info!("Stopped listening for inbound messages");
        Ok(())
    }
}

/// Long-polling loop state.
struct Poller<T: BotTransport> {
    transport: Arc<T>,
    offset: Arc<AtomicI64>,
    inbound: mpsc::Sender<InboundMessage>,
    poll_timeout: Duration,
    request_timeout: Duration,
    error_backoff: Duration,
}

impl<T: BotTransport> Poller<T> {
    async fn run(self, cancel: CancellationToken) {
        loop {
            let batch = tokio::select! {
                () = cancel.cancelled() => break,
                batch = self.poll_once() => batch,
            };

            match batch {
                Ok(messages) => {
                    for message in messages {
                        if self.inbound.send(message).await.is_err() {
                            debug!("Inbound receiver dropped, stopping long poll");
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Long poll failed");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(self.error_backoff) => {}
                    }
                }
            }
        }
        debug!("Long-polling task cancelled");
    }

    /// Fetch one batch of updates and advance the offset past it.
    async fn poll_once(&self) -> TelegramResult<Vec<InboundMessage>> {
        let params = json!({
            "offset": self.offset.load(Ordering::SeqCst),
            "timeout": self.poll_timeout.as_secs(),
            "allowed_updates": ["message"],
        });
        let value = self
            .transport
            .call(
                "getUpdates",
                params,
                self.poll_timeout + self.request_timeout,
            )
            .await?;
        let updates: Vec<Update> = serde_json::from_value(value)?;

        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            self.offset.store(last + 1, Ordering::SeqCst);
        }

        Ok(updates
            .into_iter()
            .filter_map(|update| update.message)
            .filter_map(crate::models::Message::into_inbound)
            .collect())
    }
}
