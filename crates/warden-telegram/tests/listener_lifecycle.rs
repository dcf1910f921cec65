//! Drives the bot through the public transport seam the way the
//! connection watchdog does: probe, restart, listen.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use warden_core::{ChatConnectionPort, ChatError, ChatId, ChatSenderPort};
use warden_telegram::{
    BotTransport, FileUpload, TelegramBot, TelegramConfig, TelegramError, TelegramResult,
};

/// Scripted transport: `getMe` answers and update batches are popped from
/// queues, sends always succeed.
struct ScriptedTransport {
    get_me: Mutex<VecDeque<TelegramResult<Value>>>,
    updates: Mutex<VecDeque<Value>>,
}

impl ScriptedTransport {
    fn new() -> Self {
        Self {
            get_me: Mutex::new(VecDeque::new()),
            updates: Mutex::new(VecDeque::new()),
        }
    }
}

#[async_trait]
impl BotTransport for ScriptedTransport {
    async fn call(&self, method: &str, params: Value, _timeout: Duration) -> TelegramResult<Value> {
        match method {
            "getMe" => self.get_me.lock().unwrap().pop_front().unwrap_or_else(|| {
                Ok(json!({"id": 77, "is_bot": true, "first_name": "Heroku Warden"}))
            }),
            "getUpdates" => {
                let next = self.updates.lock().unwrap().pop_front();
                match next {
                    Some(batch) => Ok(batch),
                    None => {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(json!([]))
                    }
                }
            }
            "sendMessage" => {
                assert!(params["text"].is_string());
                Ok(json!({"message_id": 1}))
            }
            other => Err(TelegramError::Api {
                code: 404,
                description: format!("unknown method {other}"),
            }),
        }
    }

    async fn upload(
        &self,
        _method: &str,
        _fields: Vec<(String, String)>,
        _file: FileUpload,
    ) -> TelegramResult<Value> {
        Ok(json!({"message_id": 2}))
    }

    async fn reset(&self) -> TelegramResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn probe_restart_and_listen() {
    let transport = ScriptedTransport::new();
    transport.get_me.lock().unwrap().push_back(Err(TelegramError::Api {
        code: 502,
        description: "Bad Gateway".to_string(),
    }));
    transport.updates.lock().unwrap().push_back(json!([{
        "update_id": 100,
        "message": {
            "from": {"id": 5, "first_name": "Owner"},
            "chat": {"id": 5, "type": "private"},
            "text": "/start"
        }
    }]));

    let (tx, mut rx) = mpsc::channel(8);
    let bot = TelegramBot::with_transport(transport, &TelegramConfig::new("9:z"), tx);

    // First probe hits the 502 and is transient; the second succeeds.
    let err = bot.whoami().await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(bot.whoami().await.unwrap().name, "Heroku Warden");

    // Restart sequence: stop (tolerating NotListening), initialize, start.
    assert_eq!(bot.stop_listening().await, Err(ChatError::NotListening));
    bot.initialize().await.unwrap();
    bot.start_listening().await.unwrap();

    let inbound = rx.recv().await.unwrap();
    assert_eq!(inbound.text, "/start");
    bot.send_text(inbound.chat, "Heroku Warden is up").await.unwrap();
    bot.send_document(ChatId(5), "logs-ALL.txt", b"a\n".to_vec(), "ALL")
        .await
        .unwrap();

    bot.stop_listening().await.unwrap();
    assert!(!bot.is_listening());
}
