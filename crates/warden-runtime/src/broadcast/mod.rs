//! Debug broadcasting to observer chats.
//!
//! Lines from the log tailer are batched in a [`LogBuffer`] and flushed to
//! every registered observer either when the batch reaches the configured
//! size or when the flush delay has passed since the first unflushed line.
//! Delivery is best-effort: one failed observer never blocks the others
//! and nothing is retried.

mod buffer;
mod observers;

pub use buffer::LogBuffer;
pub use observers::ObserverRegistry;

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use warden_core::{ChatId, ChatSenderPort, Settings};

use crate::text::truncate_chars;

/// Marker appended to a flushed batch that was cut to size.
const TRUNCATION_MARKER: &str = "...";

/// Delivery tally for one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Batching fan-out of debug lines to observer chats.
pub struct DebugBroadcaster {
    sender: Arc<dyn ChatSenderPort>,
    observers: Arc<ObserverRegistry>,
    buffer: Mutex<LogBuffer>,
    flush_threshold: usize,
    flush_delay: Duration,
    max_chars: usize,
}

impl DebugBroadcaster {
    pub fn new(
        sender: Arc<dyn ChatSenderPort>,
        observers: Arc<ObserverRegistry>,
        settings: &Settings,
    ) -> Self {
        Self {
            sender,
            observers,
            buffer: Mutex::new(LogBuffer::new()),
            flush_threshold: settings.flush_threshold,
            flush_delay: settings.flush_delay,
            max_chars: settings.max_message_chars,
        }
    }

    /// The observer registry this broadcaster delivers to.
    pub fn observers(&self) -> &Arc<ObserverRegistry> {
        &self.observers
    }

    /// Queue one line for the next flush.
    ///
    /// Lines are dropped when nobody is observing. Reaching the size
    /// threshold flushes inline; the first line of a batch arms a delayed
    /// flush instead.
    pub async fn push(self: &Arc<Self>, line: String) {
        if self.observers.is_empty() {
            return;
        }

        let mut buffer = self.buffer.lock().await;
        let len = buffer.push(line);

        if len >= self.flush_threshold {
            let batch = buffer.take();
            drop(buffer);
            if let Some(batch) = batch {
                self.deliver(&batch).await;
            }
        } else if len == 1 {
            let generation = buffer.generation();
            drop(buffer);
            let this = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(this.flush_delay).await;
                let batch = this.buffer.lock().await.take_if_generation(generation);
                if let Some(batch) = batch {
                    this.deliver(&batch).await;
                }
            });
        }
    }

    /// Flush whatever is buffered right now.
    pub async fn flush(&self) -> FlushReport {
        let batch = self.buffer.lock().await.take();
        match batch {
            Some(batch) => self.deliver(&batch).await,
            None => FlushReport::default(),
        }
    }

    /// Flush pending lines, then send a lifecycle marker to every observer.
    pub async fn announce(&self, marker: &str) -> FlushReport {
        self.flush().await;
        self.send_to_observers(marker).await
    }

    /// Send `text` once to every current observer, isolating failures.
    pub async fn send_to_observers(&self, text: &str) -> FlushReport {
        let observers = self.observers.snapshot();
        if observers.is_empty() {
            return FlushReport::default();
        }

        let sends = observers.iter().map(|&chat| self.send_one(chat, text));
        let results = join_all(sends).await;

        let delivered = results.iter().filter(|ok| **ok).count();
        let report = FlushReport {
            delivered,
            failed: results.len() - delivered,
        };
        debug!(delivered = report.delivered, failed = report.failed, "Debug batch sent");
        report
    }

    async fn deliver(&self, batch: &str) -> FlushReport {
        let text = truncate_chars(batch, self.max_chars, TRUNCATION_MARKER);
        self.send_to_observers(&text).await
    }

    async fn send_one(&self, chat: ChatId, text: &str) -> bool {
        match self.sender.send_text(chat, text).await {
            Ok(()) => true,
            Err(e) => {
                warn!(%chat, error = %e, "Failed to deliver debug message");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSender;

    fn broadcaster(sender: Arc<RecordingSender>, observers: &[i64]) -> Arc<DebugBroadcaster> {
        let registry = Arc::new(ObserverRegistry::new());
        for &id in observers {
            registry.add(ChatId(id));
        }
        let settings = Settings::default();
        Arc::new(DebugBroadcaster::new(sender, registry, &settings))
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_flush_after_delay() {
        let sender = Arc::new(RecordingSender::new());
        let broadcaster = broadcaster(Arc::clone(&sender), &[1]);

        broadcaster.push("one".to_string()).await;
        broadcaster.push("two".to_string()).await;
        assert!(sender.texts().is_empty());

        tokio::time::sleep(Duration::from_millis(3_900)).await;
        assert!(sender.texts().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(sender.texts(), vec![(ChatId(1), "one\ntwo".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_flushes_immediately() {
        let sender = Arc::new(RecordingSender::new());
        let broadcaster = broadcaster(Arc::clone(&sender), &[1]);

        for i in 0..10 {
            broadcaster.push(format!("line {i}")).await;
        }
        let texts = sender.texts();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].1.lines().count(), 10);

        // The timer armed by the first line finds its batch gone
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sender.texts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_observer_does_not_block_others() {
        let sender = Arc::new(RecordingSender::new());
        sender.fail_for(ChatId(1));
        let broadcaster = broadcaster(Arc::clone(&sender), &[1, 2]);

        broadcaster.push("hello".to_string()).await;
        let report = broadcaster.flush().await;

        assert_eq!(report, FlushReport { delivered: 1, failed: 1 });
        assert_eq!(sender.texts(), vec![(ChatId(2), "hello".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lines_dropped_without_observers() {
        let sender = Arc::new(RecordingSender::new());
        let broadcaster = broadcaster(Arc::clone(&sender), &[]);

        broadcaster.push("nobody listens".to_string()).await;
        broadcaster.observers().add(ChatId(1));
        assert_eq!(broadcaster.flush().await, FlushReport::default());
        assert!(sender.texts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_batch_is_truncated() {
        let sender = Arc::new(RecordingSender::new());
        let broadcaster = broadcaster(Arc::clone(&sender), &[1]);

        broadcaster.push("x".repeat(5000)).await;
        broadcaster.flush().await;

        let text = &sender.texts()[0].1;
        assert_eq!(text.chars().count(), 4003);
        assert!(text.ends_with("..."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_announce_flushes_before_marker() {
        let sender = Arc::new(RecordingSender::new());
        let broadcaster = broadcaster(Arc::clone(&sender), &[1]);

        broadcaster.push("pending".to_string()).await;
        broadcaster.announce("process exited").await;

        let texts: Vec<String> = sender.texts().into_iter().map(|(_, t)| t).collect();
        assert_eq!(texts, vec!["pending".to_string(), "process exited".to_string()]);
    }
}
