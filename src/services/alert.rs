use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{error, info};

use super::delivery::MessageSender;
use crate::utils::markdown::{bold, escape_markdown};

/// Minimum time between two alerts.
pub const ALERT_COOLDOWN: Duration = Duration::from_secs(5 * 60);

const MAX_ALERT_LENGTH: usize = 1500;

/// Sends rate-limited alerts to the admin chat. Does nothing when no admin
/// chat is configured.
pub struct AlertService {
    sender: Arc<dyn MessageSender>,
    admin_chat_id: Option<i64>,
    cooldown: Duration,
    last_sent: Mutex<Option<Instant>>,
}

impl AlertService {
    pub fn new(sender: Arc<dyn MessageSender>, admin_chat_id: Option<i64>) -> Self {
        Self::with_cooldown(sender, admin_chat_id, ALERT_COOLDOWN)
    }

    pub fn with_cooldown(
        sender: Arc<dyn MessageSender>,
        admin_chat_id: Option<i64>,
        cooldown: Duration,
    ) -> Self {
        Self {
            sender,
            admin_chat_id,
            cooldown,
            last_sent: Mutex::new(None),
        }
    }

    /// Send an alert unless one went out within the cooldown. Returns whether
    /// a message was sent.
    pub async fn notify(&self, message: &str) -> bool {
        let Some(chat_id) = self.admin_chat_id else {
            return false;
        };

        if !self.claim_slot() {
            info!("Alert suppressed by cooldown: {}", message);
            return false;
        }

        let body: String = message.chars().take(MAX_ALERT_LENGTH).collect();
        let text = format!(
            "🚨 {}\n\n{}\n\n_{}_",
            bold("Bot alert"),
            escape_markdown(&body),
            escape_markdown(&Local::now().format("%Y-%m-%d %H:%M:%S").to_string())
        );

        match self.sender.send_markdown(chat_id, &text).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to send alert: {}", e);
                false
            }
        }
    }

    fn claim_slot(&self) -> bool {
        let Ok(mut last) = self.last_sent.lock() else {
            return false;
        };
        let now = Instant::now();
        if last.is_some_and(|at| now.duration_since(at) < self.cooldown) {
            return false;
        }
        *last = Some(now);
        true
    }

    /// Forward panics to the admin chat, keeping the existing panic output.
    pub fn install_panic_hook(self: Arc<Self>) {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            previous(panic_info);

            let message = format!("Uncaught panic\n\n{}", panic_info);
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let alerts = self.clone();
                handle.spawn(async move {
                    alerts.notify(&message).await;
                });
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FeedError, Result};
    use async_trait::async_trait;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(i64, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl MessageSender for RecordingSender {
        async fn send_markdown(&self, chat_id: i64, text: &str) -> Result<()> {
            if self.fail {
                return Err(FeedError::Delivery("chat not found".to_string()));
            }
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_no_admin_chat_is_noop() {
        let sender = Arc::new(RecordingSender::default());
        let alerts = AlertService::new(sender.clone(), None);

        assert!(!alerts.notify("something broke").await);
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cooldown_suppresses_second_alert() {
        let sender = Arc::new(RecordingSender::default());
        let alerts = AlertService::new(sender.clone(), Some(42));

        assert!(alerts.notify("first").await);
        assert!(!alerts.notify("second").await);

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 42);
        assert!(sent[0].1.contains("Bot alert"));
        assert!(sent[0].1.contains("first"));
    }

    #[tokio::test]
    async fn test_zero_cooldown_allows_every_alert() {
        let sender = Arc::new(RecordingSender::default());
        let alerts = AlertService::with_cooldown(sender.clone(), Some(1), Duration::ZERO);

        assert!(alerts.notify("one").await);
        assert!(alerts.notify("two").await);
        assert_eq!(sender.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_send_failure_is_reported() {
        let sender = Arc::new(RecordingSender {
            fail: true,
            ..Default::default()
        });
        let alerts = AlertService::new(sender, Some(7));
        assert!(!alerts.notify("boom").await);
    }
}
