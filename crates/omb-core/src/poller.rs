//! Top-level long-poll loop: fetch updates, extract commands, hand them to the
//! per-chat workers.

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    dispatch::WorkerRegistry,
    domain::UpdateId,
    extract::CommandExtractor,
    messaging::{port::ChatTransport, types::Update},
    Result,
};

/// Pause after a failed fetch so a dead network doesn't turn into a hot loop.
const FETCH_RETRY_DELAY: Duration = Duration::from_secs(1);

pub struct UpdatePoller {
    transport: Arc<dyn ChatTransport>,
    extractor: CommandExtractor,
    registry: WorkerRegistry,
    offset: Option<UpdateId>,
}

impl UpdatePoller {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        extractor: CommandExtractor,
        registry: WorkerRegistry,
    ) -> Self {
        Self {
            transport,
            extractor,
            registry,
            offset: None,
        }
    }

    /// Next offset to request: last seen update id + 1.
    pub fn offset(&self) -> Option<UpdateId> {
        self.offset
    }

    /// Poll until `cancel` fires. Checked once per iteration; an in-flight fetch
    /// is abandoned on cancellation.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(bot = %self.extractor.bot_username(), "polling for updates");

        while !cancel.is_cancelled() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                res = self.poll_once() => {
                    if let Err(e) = res {
                        warn!("fetching updates failed: {e}");
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(FETCH_RETRY_DELAY) => {}
                        }
                    }
                }
            }
        }

        info!("polling stopped");
    }

    /// One fetch-and-dispatch pass. Returns how many updates were consumed.
    pub async fn poll_once(&mut self) -> Result<usize> {
        let updates = self.transport.fetch_updates(self.offset).await?;
        Ok(self.dispatch_batch(&updates))
    }

    fn dispatch_batch(&mut self, updates: &[Update]) -> usize {
        let mut last_seen = None;

        for update in updates {
            if let Some((chat_id, commands)) = self.extractor.extract_update(update) {
                let report = self.registry.dispatch(chat_id, commands);
                debug!(
                    update_id = update.id.0,
                    chat_id = chat_id.0,
                    accepted = report.accepted,
                    dropped = report.dropped,
                    "dispatched commands"
                );
            }
            last_seen = last_seen.max(Some(update.id));
        }

        // Advance only once the whole batch has been handed to the registry.
        if let Some(last) = last_seen {
            self.offset = Some(last.next());
        }
        updates.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::dispatch::WorkerConfig;
    use crate::domain::{ChatId, MessageId};
    use crate::messaging::types::{Entity, EntityKind, Message, SendOptions};
    use crate::ports::CommandExecutor;
    use crate::Error;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedTransport {
        batches: Mutex<VecDeque<Result<Vec<Update>>>>,
        offsets: Mutex<Vec<Option<UpdateId>>>,
        cancel: CancellationToken,
    }

    impl ScriptedTransport {
        fn new(batches: Vec<Result<Vec<Update>>>, cancel: CancellationToken) -> Self {
            Self {
                batches: Mutex::new(batches.into()),
                offsets: Mutex::new(Vec::new()),
                cancel,
            }
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn get_me(&self) -> Result<String> {
            Ok("mybot".to_string())
        }

        async fn fetch_updates(&self, offset: Option<UpdateId>) -> Result<Vec<Update>> {
            self.offsets.lock().unwrap().push(offset);
            let next = self.batches.lock().unwrap().pop_front();
            match next {
                Some(batch) => batch,
                None => {
                    // Script exhausted: behave like a long poll interrupted by SIGINT.
                    self.cancel.cancel();
                    std::future::pending().await
                }
            }
        }

        async fn send_text(&self, _chat_id: ChatId, _text: &str, _opts: SendOptions) -> Result<()> {
            Ok(())
        }

        async fn send_document(&self, _chat_id: ChatId, _uri: &str) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Collector {
        seen: Mutex<Vec<(ChatId, Command)>>,
    }

    #[async_trait]
    impl CommandExecutor for Collector {
        async fn execute(&self, chat_id: ChatId, command: Command) {
            self.seen.lock().unwrap().push((chat_id, command));
        }
    }

    fn command_update(id: i32, chat: i64, text: &str) -> Update {
        Update {
            id: UpdateId(id),
            message: Some(Message {
                id: MessageId(id * 10),
                chat_id: ChatId(chat),
                text: Some(text.to_string()),
                entities: Some(vec![Entity::new(
                    EntityKind::BotCommand,
                    0,
                    text.encode_utf16().count(),
                )]),
            }),
            edited_message: None,
        }
    }

    fn plain_update(id: i32) -> Update {
        Update {
            id: UpdateId(id),
            message: None,
            edited_message: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dispatches_and_advances_offset() {
        let cancel = CancellationToken::new();
        let transport = Arc::new(ScriptedTransport::new(
            vec![
                Ok(vec![
                    command_update(3, 1, "/joke@mybot"),
                    plain_update(4),
                    command_update(5, 2, "/about"),
                ]),
                Ok(Vec::new()),
                Err(Error::Transport("timeout".to_string())),
                Ok(vec![command_update(6, 1, "/quote")]),
            ],
            cancel.clone(),
        ));
        let collector = Arc::new(Collector::default());
        let registry = WorkerRegistry::new(collector.clone(), WorkerConfig::default());
        let poller = UpdatePoller::new(
            transport.clone(),
            CommandExtractor::new("mybot"),
            registry.clone(),
        );

        poller.run(cancel.clone()).await;
        registry.shutdown().await;

        assert_eq!(
            *transport.offsets.lock().unwrap(),
            vec![
                None,
                Some(UpdateId(6)),
                Some(UpdateId(6)),
                Some(UpdateId(6)),
                Some(UpdateId(7)),
            ]
        );

        let seen = collector.seen.lock().unwrap();
        let chat1: Vec<_> = seen
            .iter()
            .filter(|(c, _)| *c == ChatId(1))
            .map(|(_, cmd)| cmd.origin)
            .collect();
        assert_eq!(chat1, vec![MessageId(30), MessageId(60)]);
        assert_eq!(seen.len(), 3);
    }

    #[tokio::test]
    async fn poll_once_propagates_fetch_errors_without_moving_offset() {
        let cancel = CancellationToken::new();
        let transport = Arc::new(ScriptedTransport::new(
            vec![Err(Error::Transport("boom".to_string()))],
            cancel,
        ));
        let registry = WorkerRegistry::new(Arc::new(Collector::default()), WorkerConfig::default());
        let mut poller = UpdatePoller::new(transport, CommandExtractor::new("mybot"), registry);

        assert!(poller.poll_once().await.is_err());
        assert_eq!(poller.offset(), None);
    }

    #[tokio::test]
    async fn cancelled_poller_returns_immediately() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let transport = Arc::new(ScriptedTransport::new(Vec::new(), CancellationToken::new()));
        let registry = WorkerRegistry::new(Arc::new(Collector::default()), WorkerConfig::default());

        UpdatePoller::new(transport.clone(), CommandExtractor::new("mybot"), registry)
            .run(cancel)
            .await;

        assert!(transport.offsets.lock().unwrap().is_empty());
    }
}
