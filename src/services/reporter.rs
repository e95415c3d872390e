// src/services/reporter.rs

//! Error reporter: forwards cycle failures to the log channel, or to the
//! local log when that channel is unavailable.

use std::error::Error as StdError;
use std::sync::Arc;

use crate::services::discord::ChatClient;
use crate::utils::tail_graphemes;

/// Best-effort sink for failures and operational notes.
pub struct ErrorReporter {
    chat: Option<Arc<dyn ChatClient>>,
    channel_id: Option<u64>,
    max_chars: usize,
}

impl ErrorReporter {
    pub fn new(chat: Arc<dyn ChatClient>, channel_id: Option<u64>, max_chars: usize) -> Self {
        Self {
            chat: Some(chat),
            channel_id,
            max_chars,
        }
    }

    /// A reporter that only writes to the local log.
    pub fn local(max_chars: usize) -> Self {
        Self {
            chat: None,
            channel_id: None,
            max_chars,
        }
    }

    /// Render an error with its cause chain, keeping only the tail.
    pub fn render(&self, context: &str, error: &(dyn StdError + 'static)) -> String {
        let mut description = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            // Transparent wrappers already print their inner error
            let text = cause.to_string();
            if !description.contains(&text) {
                description.push_str("\ncaused by: ");
                description.push_str(&text);
            }
            source = cause.source();
        }
        let tail = tail_graphemes(&description, self.max_chars);
        format!("❗ {context}\n```\n{tail}\n```")
    }

    /// Report a failure. Returns `true` when it reached the log channel.
    pub async fn report(
        &self,
        context: &str,
        error: &(dyn StdError + Send + Sync + 'static),
    ) -> bool {
        let text = self.render(context, error);
        log::error!("{context}: {error}");
        self.post(&text).await
    }

    /// Post a message to the log channel. Falls back to the local log and
    /// returns `false` when the channel is missing or the send fails.
    pub async fn post(&self, text: &str) -> bool {
        let (Some(chat), Some(channel_id)) = (&self.chat, self.channel_id) else {
            log::info!("{text}");
            return false;
        };

        let channel = match chat.resolve_channel(channel_id).await {
            Ok(Some(channel)) => channel,
            Ok(None) => {
                log::info!("{text}");
                return false;
            }
            Err(e) => {
                log::warn!("Log channel lookup failed: {e}");
                log::info!("{text}");
                return false;
            }
        };

        match chat.send_message(&channel, text).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Log channel send failed: {e}");
                log::info!("{text}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::test_support::RecordingChat;

    #[test]
    fn test_render_truncates_to_tail() {
        let reporter = ErrorReporter::local(10);
        let err = AppError::validation("x".repeat(50) + "END");
        let text = reporter.render("news_loop 에러", &err);
        assert!(text.starts_with("❗ news_loop 에러\n```\n"));
        assert!(text.ends_with("xxxxxxxEND\n```"));
    }

    #[test]
    fn test_render_includes_cause_chain() {
        let reporter = ErrorReporter::local(1800);
        let err = AppError::Io(std::io::Error::other("disk full"));
        let text = reporter.render("news_loop 에러", &err);
        assert!(text.contains("I/O error: disk full"));
        assert!(!text.contains("caused by"));
        assert_eq!(text.matches("disk full").count(), 1);

        #[derive(Debug, thiserror::Error)]
        #[error("state refresh failed")]
        struct Wrapped(#[source] std::io::Error);

        let err = Wrapped(std::io::Error::other("disk full"));
        let text = reporter.render("news_loop 에러", &err);
        assert!(text.contains("state refresh failed\ncaused by: disk full"));
    }

    #[tokio::test]
    async fn test_report_goes_to_log_channel() {
        let chat = Arc::new(RecordingChat::with_channels(&[99]));
        let reporter = ErrorReporter::new(chat.clone(), Some(99), 1800);
        let delivered = reporter
            .report("tick_loop 에러", &AppError::config("boom"))
            .await;
        assert!(delivered);
        let sent = chat.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 99);
        assert!(sent[0].1.contains("boom"));
    }

    #[tokio::test]
    async fn test_report_falls_back_when_channel_missing() {
        let chat = Arc::new(RecordingChat::with_channels(&[]));
        let reporter = ErrorReporter::new(chat.clone(), Some(99), 1800);
        assert!(!reporter.report("tick_loop 에러", &AppError::config("boom")).await);
        assert!(chat.sent().is_empty());

        assert!(!ErrorReporter::local(100).post("hello").await);
    }

    #[tokio::test]
    async fn test_report_falls_back_when_send_fails() {
        let chat = Arc::new(RecordingChat::with_channels(&[99]));
        chat.fail_sends(true);
        let reporter = ErrorReporter::new(chat.clone(), Some(99), 1800);
        assert!(!reporter.report("news_loop 에러", &AppError::config("boom")).await);
    }
}
