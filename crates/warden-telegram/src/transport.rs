//! HTTP transport abstraction for the Bot API.
//!
//! [`BotTransport`] is the seam between the bot client and the network, so
//! the client can be driven by a fake in tests. The production
//! implementation POSTs JSON (or multipart for uploads) to
//! `{base}/bot{token}/{method}` and retries network errors and 5xx replies
//! with exponential backoff.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use url::Url;

use crate::config::TelegramConfig;
use crate::error::{TelegramError, TelegramResult};
use crate::models::ApiResponse;

// ============================================================================
// Transport Trait
// ============================================================================

/// A file attached to a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// Form field carrying the file (e.g. `document`).
    pub field: String,
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Executes Bot API methods and returns the `result` of the reply.
#[async_trait]
pub trait BotTransport: Send + Sync {
    /// Call `method` with JSON parameters.
    async fn call(&self, method: &str, params: Value, timeout: Duration) -> TelegramResult<Value>;

    /// Call `method` as a multipart upload.
    async fn upload(
        &self,
        method: &str,
        fields: Vec<(String, String)>,
        file: FileUpload,
    ) -> TelegramResult<Value>;

    /// Drop pooled connections so the next call opens fresh ones.
    async fn reset(&self) -> TelegramResult<()>;
}

// ============================================================================
// Reqwest Transport
// ============================================================================

/// Production transport using reqwest.
pub struct ReqwestTransport {
    client: RwLock<reqwest::Client>,
    endpoint: Url,
    timeout: Duration,
    max_retries: u8,
    retry_base_delay: Duration,
}

impl ReqwestTransport {
    /// Create a transport for the configured bot.
    pub fn new(config: &TelegramConfig) -> TelegramResult<Self> {
        Ok(Self {
            client: RwLock::new(build_client(config.timeout)?),
            endpoint: endpoint_url(&config.base_url, &config.token)?,
            timeout: config.timeout,
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
        })
    }

    fn client(&self) -> reqwest::Client {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn method_url(&self, method: &str) -> TelegramResult<Url> {
        Ok(self.endpoint.join(method)?)
    }

    /// Send a request with automatic retry for transient errors.
    ///
    /// `build` is invoked once per attempt since multipart bodies cannot be
    /// replayed.
    async fn send_with_retry<F>(&self, build: F) -> TelegramResult<Value>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder + Send + Sync,
    {
        let mut last_error: Option<TelegramError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let factor = 2u32.saturating_pow(u32::from(attempt) - 1);
                tokio::time::sleep(self.retry_base_delay.saturating_mul(factor)).await;
            }

            let client = self.client();
            match build(&client).send().await {
                Ok(response) => {
                    let status = response.status();

                    // 5xx errors are retryable (server-side issues)
                    if status.is_server_error() && attempt < self.max_retries {
                        last_error = Some(TelegramError::Api {
                            code: status.as_u16(),
                            description: status
                                .canonical_reason()
                                .unwrap_or("server error")
                                .to_string(),
                        });
                        continue;
                    }

                    let body = response.bytes().await.map_err(TelegramError::network)?;
                    return decode_reply(status.as_u16(), &body);
                }
                // A timed out request is reported as is; the caller owns the deadline.
                Err(e) if e.is_timeout() => return Err(TelegramError::network(e)),
                Err(e) => {
                    let err = TelegramError::network(e);
                    if attempt < self.max_retries {
                        tracing::debug!(attempt, error = %err, "Bot API request failed, retrying");
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| TelegramError::InvalidResponse {
            message: "no request attempt was made".to_string(),
        }))
    }
}

#[async_trait]
impl BotTransport for ReqwestTransport {
    async fn call(&self, method: &str, params: Value, timeout: Duration) -> TelegramResult<Value> {
        let url = self.method_url(method)?;
        self.send_with_retry(|client| client.post(url.clone()).timeout(timeout).json(&params))
            .await
    }

    async fn upload(
        &self,
        method: &str,
        fields: Vec<(String, String)>,
        file: FileUpload,
    ) -> TelegramResult<Value> {
        let url = self.method_url(method)?;
        self.send_with_retry(|client| {
            let mut form = Form::new();
            for (name, value) in &fields {
                form = form.text(name.clone(), value.clone());
            }
            let part = Part::bytes(file.content.clone()).file_name(file.file_name.clone());
            client
                .post(url.clone())
                .timeout(self.timeout)
                .multipart(form.part(file.field.clone(), part))
        })
        .await
    }

    async fn reset(&self) -> TelegramResult<()> {
        let fresh = build_client(self.timeout)?;
        *self.client.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        Ok(())
    }
}

fn build_client(timeout: Duration) -> TelegramResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("warden/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(TelegramError::network)
}

/// Build `{base}/bot{token}/`, ready for joining method names.
fn endpoint_url(base: &str, token: &str) -> TelegramResult<Url> {
    let mut base = Url::parse(base)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    // Tokens contain a colon; the leading "./" keeps it from parsing as a scheme.
    Ok(base.join(&format!("./bot{token}/"))?)
}

/// Decode a Bot API reply envelope.
fn decode_reply(status: u16, body: &[u8]) -> TelegramResult<Value> {
    let envelope: ApiResponse = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(_) if status >= 400 => {
            return Err(TelegramError::Api {
                code: status,
                description: format!("HTTP {status}"),
            });
        }
        Err(e) => return Err(e.into()),
    };

    if envelope.ok {
        return envelope
            .result
            .ok_or_else(|| TelegramError::InvalidResponse {
                message: "reply has no result".to_string(),
            });
    }

    Err(TelegramError::Api {
        code: envelope.error_code.unwrap_or(status),
        description: envelope.description.unwrap_or_default(),
    })
}

// ============================================================================
// Fake Transport for Testing
// ============================================================================
