//! End-to-end poll scenario over the public API: scripted listing pages,
//! a recording chat client and the JSON state file on disk.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use newsbell::error::{AppError, Result};
use newsbell::models::{Config, NewsSource};
use newsbell::pipeline::{BootstrapGate, PollCycle};
use newsbell::services::{
    Anchor, Channel, ChatClient, Dispatcher, FeedFetcher, MarkupExtractor, PageFetcher,
};
use newsbell::storage::{DedupStore, JsonDedupStore};
use tempfile::TempDir;

const NOTICE: &str = "https://mabinogimobile.nexon.com/News/Notice";
const EVENTS: &str = "https://mabinogimobile.nexon.com/News/Events?headlineId=2501";
const CHANNEL: u64 = 1234;

/// Pages are stored as `title|href` lines, parsed by [`LineExtractor`].
#[derive(Default)]
struct Pages(Mutex<HashMap<String, String>>);

impl Pages {
    fn set(&self, url: &str, entries: &[(&str, &str)]) {
        let body = entries
            .iter()
            .map(|(title, href)| format!("{title}|{href}"))
            .collect::<Vec<_>>()
            .join("\n");
        self.0.lock().unwrap().insert(url.to_string(), body);
    }
}

#[async_trait]
impl PageFetcher for Pages {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<String> {
        self.0
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::status(url, 404))
    }
}

struct LineExtractor;

impl MarkupExtractor for LineExtractor {
    fn extract_anchors(&self, text: &str) -> Result<Vec<Anchor>> {
        Ok(text
            .lines()
            .filter_map(|line| line.split_once('|'))
            .map(|(title, href)| Anchor::new(title, href))
            .collect())
    }
}

#[derive(Default)]
struct Chat(Mutex<Vec<String>>);

impl Chat {
    fn titles(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|text| text.lines().last())
            .map(|line| line.trim_matches('*').to_string())
            .collect()
    }
}

#[async_trait]
impl ChatClient for Chat {
    async fn resolve_channel(&self, id: u64) -> Result<Option<Channel>> {
        Ok((id == CHANNEL).then(|| Channel { id, name: None }))
    }

    async fn send_message(&self, _channel: &Channel, text: &str) -> Result<()> {
        self.0.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn config(state_file: std::path::PathBuf) -> Config {
    let mut config = Config::default();
    config.sources = vec![
        NewsSource::new("공지사항", NOTICE, "📣 공지"),
        NewsSource::new("이벤트", EVENTS, "🎉 이벤트"),
    ];
    config.discord.notice_channel_id = Some(CHANNEL);
    config.discord.announce_role_id = Some(42);
    config.poller.dispatch_delay_ms = 0;
    config.storage.state_file = state_file;
    config
}

fn cycle(config: &Config, pages: Arc<Pages>, chat: Arc<Chat>, gate: BootstrapGate) -> PollCycle {
    let feed = FeedFetcher::new(pages, Arc::new(LineExtractor), config);
    let store = Arc::new(JsonDedupStore::new(
        &config.storage.state_file,
        config.source_names(),
    ));
    let dispatcher = Arc::new(Dispatcher::new(chat, config).unwrap());
    PollCycle::new(feed, store, dispatcher, gate, config)
}

#[tokio::test]
async fn test_backlog_is_silent_and_new_items_survive_restart() {
    let tmp = TempDir::new().unwrap();
    let config = config(tmp.path().join("seen.json"));
    let pages = Arc::new(Pages::default());
    let chat = Arc::new(Chat::default());

    pages.set(
        NOTICE,
        &[
            ("C", "/News/Notice/3"),
            ("B", "/News/Notice/2"),
            ("A", "/News/Notice/1"),
        ],
    );
    pages.set(EVENTS, &[("봄 이벤트", "/News/Events/10")]);

    // First process: bootstrap only
    let first = cycle(&config, pages.clone(), chat.clone(), BootstrapGate::new());
    let report = first.run().await.unwrap();
    assert!(report.sources.iter().all(|s| s.baselined));
    assert!(chat.titles().is_empty());

    // Restarted process with the gate already open: known items stay quiet
    let second = cycle(&config, pages.clone(), chat.clone(), BootstrapGate::opened());
    assert_eq!(second.run().await.unwrap().announced(), 0);

    pages.set(
        NOTICE,
        &[
            ("E", "https://mabinogimobile.nexon.com/News/Notice/5#top"),
            ("D", "/News/Notice/4"),
            ("C", "/News/Notice/3"),
        ],
    );
    let report = second.run().await.unwrap();
    assert_eq!(report.announced(), 2);
    assert_eq!(chat.titles(), ["D", "E"]);
    assert!(chat.0.lock().unwrap()[0].starts_with("<@&42> 📣 공지 **새 글**"));

    // The state file holds every id, oldest first per source
    let store = JsonDedupStore::new(&config.storage.state_file, config.source_names());
    let state = store.load().await;
    assert_eq!(state.ids("공지사항").len(), 5);
    assert_eq!(state.ids("이벤트").len(), 1);

    let third = cycle(&config, pages, chat.clone(), BootstrapGate::opened());
    assert_eq!(third.run().await.unwrap().announced(), 0);
    assert_eq!(chat.titles().len(), 2);
}
