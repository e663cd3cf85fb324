use std::sync::Arc;

use tokio::{sync::mpsc, time::timeout};
use tracing::{debug, info};

use crate::{command::Command, domain::ChatId};

use super::registry::RegistryInner;

/// Drains one chat's queue, one command at a time, until it goes idle.
pub(super) struct ChatWorker {
    chat_id: ChatId,
    generation: u64,
    queue: mpsc::Receiver<Command>,
    registry: Arc<RegistryInner>,
}

impl ChatWorker {
    pub(super) fn new(
        chat_id: ChatId,
        generation: u64,
        queue: mpsc::Receiver<Command>,
        registry: Arc<RegistryInner>,
    ) -> Self {
        Self {
            chat_id,
            generation,
            queue,
            registry,
        }
    }

    pub(super) async fn run(mut self) {
        info!(chat_id = self.chat_id.0, "worker created");

        let idle = self.registry.cfg.idle_timeout;
        loop {
            match timeout(idle, self.queue.recv()).await {
                Ok(Some(command)) => self.execute(command).await,
                // Every sender is gone: the registry itself was dropped.
                Ok(None) => break,
                Err(_) => {
                    let leftovers =
                        self.registry
                            .retire(self.chat_id, self.generation, &mut self.queue);
                    let Some(leftovers) = leftovers else {
                        break;
                    };
                    debug!(
                        chat_id = self.chat_id.0,
                        count = leftovers.len(),
                        "commands arrived while retiring; staying up"
                    );
                    for command in leftovers {
                        self.execute(command).await;
                    }
                }
            }
        }

        info!(chat_id = self.chat_id.0, "worker retired");
    }

    async fn execute(&self, command: Command) {
        self.registry.executor.execute(self.chat_id, command).await;
    }
}
