use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, UpdateId},
    messaging::{
        port::ChatTransport,
        types::{SendOptions, Update},
    },
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* outbound sends (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between sends to the same chat.
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40), // ~25/sec
            per_chat_min_interval: Duration::from_millis(1050), // ~0.95/sec
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// ChatTransport decorator that rate-limits outbound sends.
///
/// Picture sets fan out into several sends per command; spacing them keeps the
/// bot clear of Telegram 429s. Fetching updates is never throttled.
pub struct ThrottledTransport {
    inner: Arc<dyn ChatTransport>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_chat: Mutex<HashMap<ChatId, IntervalLimiter>>,
}

impl ThrottledTransport {
    pub fn new(inner: Arc<dyn ChatTransport>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_chat: Mutex::new(HashMap::new()),
        }
    }

    async fn throttle_chat(&self, chat_id: ChatId) {
        let global_wait = { self.global.lock().await.reserve() };
        let chat_wait = {
            let mut map = self.per_chat.lock().await;
            // Drop limiters whose slot has already passed so idle chats don't accumulate.
            let now = Instant::now();
            map.retain(|_, lim| lim.next > now);
            map.entry(chat_id)
                .or_insert_with(|| IntervalLimiter::new(self.cfg.per_chat_min_interval))
                .reserve()
        };

        let wait = global_wait.max(chat_wait);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[async_trait]
impl ChatTransport for ThrottledTransport {
    async fn get_me(&self) -> Result<String> {
        self.inner.get_me().await
    }

    async fn fetch_updates(&self, offset: Option<UpdateId>) -> Result<Vec<Update>> {
        self.inner.fetch_updates(offset).await
    }

    async fn send_text(&self, chat_id: ChatId, text: &str, opts: SendOptions) -> Result<()> {
        self.throttle_chat(chat_id).await;
        self.inner.send_text(chat_id, text, opts).await
    }

    async fn send_document(&self, chat_id: ChatId, uri: &str) -> Result<()> {
        self.throttle_chat(chat_id).await;
        self.inner.send_document(chat_id, uri).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct StampingTransport {
        sends: StdMutex<Vec<(ChatId, Instant)>>,
    }

    #[async_trait]
    impl ChatTransport for StampingTransport {
        async fn get_me(&self) -> Result<String> {
            Ok("bot".to_string())
        }

        async fn fetch_updates(&self, _offset: Option<UpdateId>) -> Result<Vec<Update>> {
            Ok(Vec::new())
        }

        async fn send_text(&self, chat_id: ChatId, _text: &str, _opts: SendOptions) -> Result<()> {
            self.sends.lock().unwrap().push((chat_id, Instant::now()));
            Ok(())
        }

        async fn send_document(&self, chat_id: ChatId, _uri: &str) -> Result<()> {
            self.sends.lock().unwrap().push((chat_id, Instant::now()));
            Ok(())
        }
    }

    #[test]
    fn limiter_spaces_reservations() {
        let mut lim = IntervalLimiter::new(Duration::from_secs(1));
        assert_eq!(lim.reserve(), Duration::ZERO);
        let second = lim.reserve();
        assert!(second > Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn same_chat_sends_are_spaced() {
        let inner = Arc::new(StampingTransport::default());
        let throttled = ThrottledTransport::new(inner.clone(), ThrottleConfig::default());

        throttled
            .send_text(ChatId(1), "a", SendOptions::default())
            .await
            .unwrap();
        throttled.send_document(ChatId(1), "b.gif").await.unwrap();
        throttled
            .send_text(ChatId(2), "c", SendOptions::default())
            .await
            .unwrap();

        let sends = inner.sends.lock().unwrap();
        assert_eq!(sends.len(), 3);
        let same_chat_gap = sends[1].1 - sends[0].1;
        assert!(same_chat_gap >= Duration::from_millis(1050));
        // Other chats only wait for the global slot.
        let other_chat_gap = sends[2].1 - sends[1].1;
        assert!(other_chat_gap < Duration::from_millis(1050));
    }
}
