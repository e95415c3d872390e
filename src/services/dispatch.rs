// src/services/dispatch.rs

//! Notification dispatcher: renders message templates and hands them to the
//! chat client.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};

use crate::error::Result;
use crate::models::{Config, Item, MessageTemplates, NewsSource, TickAlert};
use crate::services::discord::{Channel, ChatClient};

/// Replace `{key}` placeholders and trim the result, so an empty leading
/// mention does not leave a dangling space.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in values {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out.trim().to_string()
}

/// Role mention token, empty when the role is not configured.
pub fn mention(role_id: Option<u64>) -> String {
    role_id.map(|id| format!("<@&{id}>")).unwrap_or_default()
}

/// Thin wrapper over [`ChatClient`] that knows destinations and templates.
pub struct Dispatcher {
    chat: Arc<dyn ChatClient>,
    templates: MessageTemplates,
    zone: FixedOffset,
    notice_channel_id: Option<u64>,
    alert_channel_id: Option<u64>,
    announce_role_id: Option<u64>,
    hour_tick_role_id: Option<u64>,
    field_boss_role_id: Option<u64>,
}

impl Dispatcher {
    pub fn new(chat: Arc<dyn ChatClient>, config: &Config) -> Result<Self> {
        Ok(Self {
            chat,
            templates: config.messages.clone(),
            zone: config.ticker.zone()?,
            notice_channel_id: config.discord.notice_channel_id,
            alert_channel_id: config.discord.alert_channel_id,
            announce_role_id: config.discord.announce_role_id,
            hour_tick_role_id: config.discord.hour_tick_role_id,
            field_boss_role_id: config.discord.field_boss_role_id,
        })
    }

    /// Civil time zone used for every rendered timestamp.
    pub fn zone(&self) -> FixedOffset {
        self.zone
    }

    /// Channel for news notifications, if configured and reachable.
    pub async fn notice_channel(&self) -> Result<Option<Channel>> {
        self.resolve(self.notice_channel_id).await
    }

    /// Channel for time-of-day alerts, if configured and reachable.
    pub async fn alert_channel(&self) -> Result<Option<Channel>> {
        self.resolve(self.alert_channel_id).await
    }

    async fn resolve(&self, id: Option<u64>) -> Result<Option<Channel>> {
        match id {
            Some(id) => self.chat.resolve_channel(id).await,
            None => Ok(None),
        }
    }

    pub fn render_news(&self, source: &NewsSource, item: &Item, now: DateTime<Utc>) -> String {
        let local = now.with_timezone(&self.zone);
        let time = local.format("%m/%d %H:%M").to_string();
        let mention = mention(self.announce_role_id);
        render(
            &self.templates.news,
            &[
                ("mention", &mention),
                ("label", &source.label),
                ("time", &time),
                ("link", &item.link),
                ("title", &item.title),
            ],
        )
    }

    pub fn render_alert(&self, alert: TickAlert, now: DateTime<Utc>) -> String {
        let local = now.with_timezone(&self.zone);
        let date = local.format("%m/%d (%a)").to_string();
        let time = local.format("%H:%M").to_string();
        match alert {
            TickAlert::Hourly => render(
                &self.templates.hourly,
                &[
                    ("mention", &mention(self.hour_tick_role_id)),
                    ("date", &date),
                    ("time", &time),
                ],
            ),
            TickAlert::FieldBoss => render(
                &self.templates.field_boss,
                &[
                    ("mention", &mention(self.field_boss_role_id)),
                    ("date", &date),
                    ("time", &time),
                ],
            ),
        }
    }

    /// Post one news notification.
    pub async fn announce(
        &self,
        channel: &Channel,
        source: &NewsSource,
        item: &Item,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let text = self.render_news(source, item, now);
        self.chat.send_message(channel, &text).await?;
        log::info!("[news] {} announced: {}", source.name, item.link);
        Ok(())
    }

    /// Post one time-of-day alert.
    pub async fn send_alert(
        &self,
        channel: &Channel,
        alert: TickAlert,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let text = self.render_alert(alert, now);
        self.chat.send_message(channel, &text).await?;
        log::info!("[tick] {alert} alert sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::test_support::RecordingChat;

    fn config() -> Config {
        let mut config = Config::default();
        config.discord.notice_channel_id = Some(10);
        config.discord.alert_channel_id = Some(20);
        config.discord.announce_role_id = Some(777);
        config.discord.field_boss_role_id = Some(888);
        config
    }

    // 2025-09-06 03:00 UTC = 12:00 KST (Saturday)
    fn noon_kst() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 6, 3, 0, 0).unwrap()
    }

    #[test]
    fn test_render_drops_empty_mention() {
        assert_eq!(render("{mention} hi {name}", &[("mention", ""), ("name", "x")]), "hi x");
        assert_eq!(mention(Some(5)), "<@&5>");
        assert_eq!(mention(None), "");
    }

    #[test]
    fn test_render_news() {
        let dispatcher = Dispatcher::new(Arc::new(RecordingChat::default()), &config()).unwrap();
        let source = NewsSource::new("공지사항", "https://example.com/News/Notice", "📣 공지");
        let item = Item::new("점검 안내", "https://example.com/News/Notice/1");
        assert_eq!(
            dispatcher.render_news(&source, &item, noon_kst()),
            "<@&777> 📣 공지 **새 글**\n🗓 `09/06 12:00`\n🔗 https://example.com/News/Notice/1\n**점검 안내**"
        );
    }

    #[test]
    fn test_render_alerts() {
        let dispatcher = Dispatcher::new(Arc::new(RecordingChat::default()), &config()).unwrap();
        assert_eq!(
            dispatcher.render_alert(TickAlert::Hourly, noon_kst()),
            "⏰ `09/06 (Sat)` **12:00 정각 알림!**"
        );
        assert_eq!(
            dispatcher.render_alert(TickAlert::FieldBoss, noon_kst()),
            "<@&888> 🐲 **필드보스 시간!** `12:00`"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_destination_is_absent() {
        let chat = Arc::new(RecordingChat::with_channels(&[10, 20]));
        let mut config = config();
        config.discord.alert_channel_id = None;
        let dispatcher = Dispatcher::new(chat, &config).unwrap();
        assert!(dispatcher.notice_channel().await.unwrap().is_some());
        assert!(dispatcher.alert_channel().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_announce_sends_rendered_text() {
        let chat = Arc::new(RecordingChat::with_channels(&[10]));
        let dispatcher = Dispatcher::new(chat.clone(), &config()).unwrap();
        let channel = dispatcher.notice_channel().await.unwrap().unwrap();
        let source = NewsSource::new("공지사항", "https://example.com/News/Notice", "📣 공지");
        let item = Item::new("점검 안내", "https://example.com/News/Notice/1");

        dispatcher.announce(&channel, &source, &item, noon_kst()).await.unwrap();

        let sent = chat.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 10);
        assert!(sent[0].1.contains("**점검 안내**"));
    }
}
