// src/pipeline/tick.rs

//! Time-of-day alerts.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Timelike, Utc};

use crate::error::Result;
use crate::models::{TickAlert, TickerConfig};
use crate::services::Dispatcher;

/// Hours at which each alert fires, in the local civil zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSchedule {
    pub hourly_start: u32,
    pub hourly_end: u32,
    pub field_boss_hours: Vec<u32>,
}

impl AlertSchedule {
    pub fn from_config(config: &TickerConfig) -> Self {
        Self {
            hourly_start: config.hourly_start_hour,
            hourly_end: config.hourly_end_hour,
            field_boss_hours: config.field_boss_hours.clone(),
        }
    }
}

impl Default for AlertSchedule {
    fn default() -> Self {
        Self::from_config(&TickerConfig::default())
    }
}

/// Alerts due at `local`, hourly first. Only the top of the hour counts.
pub fn due_alerts(schedule: &AlertSchedule, local: &DateTime<FixedOffset>) -> Vec<TickAlert> {
    if local.minute() != 0 {
        return Vec::new();
    }

    let hour = local.hour();
    let mut due = Vec::with_capacity(2);
    if (schedule.hourly_start..=schedule.hourly_end).contains(&hour) {
        due.push(TickAlert::Hourly);
    }
    if schedule.field_boss_hours.contains(&hour) {
        due.push(TickAlert::FieldBoss);
    }
    due
}

/// Evaluates the clock and sends whatever is due. Keeps no state.
pub struct TickCycle {
    dispatcher: Arc<Dispatcher>,
    schedule: AlertSchedule,
}

impl TickCycle {
    pub fn new(dispatcher: Arc<Dispatcher>, schedule: AlertSchedule) -> Self {
        Self {
            dispatcher,
            schedule,
        }
    }

    /// Alerts that would fire at `now`.
    pub fn due_at(&self, now: DateTime<Utc>) -> Vec<TickAlert> {
        due_alerts(&self.schedule, &now.with_timezone(&self.dispatcher.zone()))
    }

    pub async fn run(&self) -> Result<Vec<TickAlert>> {
        self.run_at(Utc::now()).await
    }

    /// Send the alerts due at `now`. Returns what was sent.
    ///
    /// Each alert is attempted even if an earlier one fails; the first
    /// failure is returned after all attempts.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<Vec<TickAlert>> {
        let due = self.due_at(now);
        if due.is_empty() {
            return Ok(due);
        }

        let Some(channel) = self.dispatcher.alert_channel().await? else {
            log::debug!("[tick] alert channel unavailable, skipping");
            return Ok(Vec::new());
        };

        let mut sent = Vec::with_capacity(due.len());
        let mut first_error = None;
        for alert in due {
            match self.dispatcher.send_alert(&channel, alert, now).await {
                Ok(()) => sent.push(alert),
                Err(e) => {
                    log::warn!("[tick] {alert} alert failed: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(sent),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::Config;
    use crate::test_support::RecordingChat;

    const ALERT_CHANNEL: u64 = 20;

    fn kst(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 9, 6, hour, minute, 0)
            .unwrap()
    }

    fn cycle(chat: Arc<RecordingChat>) -> TickCycle {
        let mut config = Config::default();
        config.discord.alert_channel_id = Some(ALERT_CHANNEL);
        let dispatcher = Arc::new(Dispatcher::new(chat, &config).unwrap());
        TickCycle::new(dispatcher, AlertSchedule::from_config(&config.ticker))
    }

    #[test]
    fn test_due_alerts() {
        let schedule = AlertSchedule::default();
        assert_eq!(due_alerts(&schedule, &kst(9, 0)), [TickAlert::Hourly]);
        assert_eq!(due_alerts(&schedule, &kst(23, 0)), [TickAlert::Hourly]);
        assert!(due_alerts(&schedule, &kst(8, 0)).is_empty());
        assert!(due_alerts(&schedule, &kst(0, 0)).is_empty());
        assert!(due_alerts(&schedule, &kst(10, 1)).is_empty());
        assert_eq!(
            due_alerts(&schedule, &kst(12, 0)),
            [TickAlert::Hourly, TickAlert::FieldBoss]
        );
        assert_eq!(
            due_alerts(&schedule, &kst(20, 0)),
            [TickAlert::Hourly, TickAlert::FieldBoss]
        );
    }

    #[tokio::test]
    async fn test_noon_sends_two_messages() {
        let chat = Arc::new(RecordingChat::with_channels(&[ALERT_CHANNEL]));
        let sent = cycle(chat.clone())
            .run_at(kst(12, 0).with_timezone(&Utc))
            .await
            .unwrap();
        assert_eq!(sent, [TickAlert::Hourly, TickAlert::FieldBoss]);

        let messages = chat.sent();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].1.contains("12:00 정각 알림!"));
        assert!(messages[1].1.contains("필드보스 시간!"));
    }

    #[tokio::test]
    async fn test_failed_hourly_still_sends_field_boss() {
        let chat = Arc::new(RecordingChat::with_channels(&[ALERT_CHANNEL]));
        chat.fail_next_sends(1);
        let result = cycle(chat.clone())
            .run_at(kst(20, 0).with_timezone(&Utc))
            .await;
        assert!(result.is_err());

        let messages = chat.sent();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].1.contains("필드보스 시간!"));
    }

    #[tokio::test]
    async fn test_off_hour_sends_nothing() {
        let chat = Arc::new(RecordingChat::with_channels(&[ALERT_CHANNEL]));
        let sent = cycle(chat.clone())
            .run_at(kst(12, 30).with_timezone(&Utc))
            .await
            .unwrap();
        assert!(sent.is_empty());
        assert!(chat.sent().is_empty());
    }

    #[tokio::test]
    async fn test_missing_alert_channel_is_noop() {
        let chat = Arc::new(RecordingChat::with_channels(&[]));
        let sent = cycle(chat.clone())
            .run_at(kst(18, 0).with_timezone(&Utc))
            .await
            .unwrap();
        assert!(sent.is_empty());
        assert!(chat.sent().is_empty());
    }
}
