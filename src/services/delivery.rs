use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::error::{FeedError, Result};
use crate::feeds::FeedEntry;
use crate::utils::markdown::{bold, escape_markdown};

/// Sends a MarkdownV2 message to a chat.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_markdown(&self, chat_id: i64, text: &str) -> Result<()>;
}

#[async_trait]
impl MessageSender for Bot {
    async fn send_markdown(&self, chat_id: i64, text: &str) -> Result<()> {
        self.send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::MarkdownV2)
            .await
            .map(|_| ())
            .map_err(|e| FeedError::Delivery(e.to_string()))
    }
}

pub fn render_feed_message(feed_title: &str, entry: &FeedEntry) -> String {
    let title = if entry.title.trim().is_empty() {
        "(untitled)"
    } else {
        entry.title.trim()
    };

    let mut text = format!("📰 {}\n\n📄 {}", bold(feed_title), escape_markdown(title));
    if !entry.link.is_empty() {
        text.push_str(&format!("\n🔗 {}", escape_markdown(&entry.link)));
    }
    text
}

pub fn render_reminder_message(message: &str) -> String {
    format!("⏰ {}\n\n📝 {}", bold("Reminder"), escape_markdown(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_feed_message() {
        let entry = FeedEntry::new("https://example.com/post-1", "Hello, world!");
        let text = render_feed_message("Example Blog", &entry);
        assert_eq!(
            text,
            "📰 *Example Blog*\n\n📄 Hello, world\\!\n🔗 https://example\\.com/post\\-1"
        );
    }

    #[test]
    fn test_render_feed_message_untitled_without_link() {
        let mut entry = FeedEntry::new("guid-1", "  ");
        entry.link.clear();
        let text = render_feed_message("Feed", &entry);
        assert_eq!(text, "📰 *Feed*\n\n📄 \\(untitled\\)");
    }

    #[test]
    fn test_render_reminder_message() {
        assert_eq!(
            render_reminder_message("Call mom (at 5)."),
            "⏰ *Reminder*\n\n📝 Call mom \\(at 5\\)\\."
        );
    }
}
