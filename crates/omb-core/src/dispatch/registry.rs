use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::task::TaskTracker;
use tracing::warn;

use crate::{command::Command, domain::ChatId, ports::CommandExecutor};

use super::{worker::ChatWorker, WorkerConfig};

/// Process-wide map from chat to its live worker.
///
/// Lookup-or-create and worker retirement are serialized by one lock, so a
/// command is never accepted into a queue whose worker has already exited.
/// Enqueueing itself happens outside the lock and never blocks: a full queue
/// drops the command.
#[derive(Clone)]
pub struct WorkerRegistry {
    inner: Arc<RegistryInner>,
}

pub(super) struct RegistryInner {
    pub(super) cfg: WorkerConfig,
    pub(super) executor: Arc<dyn CommandExecutor>,
    workers: Mutex<HashMap<ChatId, WorkerSlot>>,
    tracker: TaskTracker,
    next_generation: AtomicU64,
}

/// Producer side of a live worker's queue.
#[derive(Clone)]
struct WorkerSlot {
    generation: u64,
    queue: mpsc::Sender<Command>,
}

/// A freshly created slot whose worker has not been spawned yet.
struct NewWorker {
    generation: u64,
    queue: mpsc::Receiver<Command>,
}

/// What happened to one `dispatch` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub accepted: usize,
    pub dropped: usize,
    /// A new worker was started for the chat.
    pub spawned: bool,
}

impl WorkerRegistry {
    pub fn new(executor: Arc<dyn CommandExecutor>, cfg: WorkerConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                cfg,
                executor,
                workers: Mutex::new(HashMap::new()),
                tracker: TaskTracker::new(),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Queue `commands` for `chat_id`, starting a worker if the chat has none.
    ///
    /// Must be called from within a tokio runtime. Never waits on the queue.
    pub fn dispatch(
        &self,
        chat_id: ChatId,
        commands: impl IntoIterator<Item = Command>,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut commands = commands.into_iter().peekable();
        if commands.peek().is_none() {
            return report;
        }

        let mut slot = self.slot_for(chat_id, &mut report);
        for mut command in commands {
            loop {
                match slot.queue.try_send(command) {
                    Ok(()) => {
                        report.accepted += 1;
                        break;
                    }
                    Err(TrySendError::Full(_)) => {
                        report.dropped += 1;
                        break;
                    }
                    // The worker retired (or swapped queues) after we looked it up.
                    Err(TrySendError::Closed(back)) => {
                        command = back;
                        slot = self.slot_for(chat_id, &mut report);
                    }
                }
            }
        }

        if report.dropped > 0 {
            warn!(
                chat_id = chat_id.0,
                dropped = report.dropped,
                "chat queue full; dropping commands"
            );
        }
        report
    }

    /// Number of chats with a live worker.
    pub fn active_workers(&self) -> usize {
        self.inner.lock().len()
    }

    /// Wait until every live worker has drained its queue and retired through
    /// its idle timeout. Call once nothing dispatches anymore.
    pub async fn shutdown(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }

    fn slot_for(&self, chat_id: ChatId, report: &mut DispatchReport) -> WorkerSlot {
        let (slot, created) = self.inner.acquire(chat_id);
        if let Some(new) = created {
            let worker = ChatWorker::new(chat_id, new.generation, new.queue, self.inner.clone());
            self.inner.tracker.spawn(worker.run());
            report.spawned = true;
        }
        slot
    }
}

impl RegistryInner {
    fn lock(&self) -> MutexGuard<'_, HashMap<ChatId, WorkerSlot>> {
        // The map stays consistent even if a holder panicked.
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up the live slot for `chat_id` or create one. The caller that gets
    /// `Some(NewWorker)` owns spawning the worker.
    fn acquire(&self, chat_id: ChatId) -> (WorkerSlot, Option<NewWorker>) {
        let mut workers = self.lock();

        // A closed sender means the worker died without retiring (panic).
        if let Some(slot) = workers.get(&chat_id).filter(|s| !s.queue.is_closed()) {
            return (slot.clone(), None);
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.cfg.queue_capacity);
        let slot = WorkerSlot {
            generation,
            queue: tx,
        };
        workers.insert(chat_id, slot.clone());

        (
            slot,
            Some(NewWorker {
                generation,
                queue: rx,
            }),
        )
    }

    /// Called by an idle worker. Returns `None` once the worker is unregistered
    /// and must exit.
    ///
    /// Commands that slipped in between the idle timeout and taking the lock
    /// are handed back; the worker keeps its slot under a fresh queue and runs
    /// them first.
    pub(super) fn retire(
        &self,
        chat_id: ChatId,
        generation: u64,
        queue: &mut mpsc::Receiver<Command>,
    ) -> Option<Vec<Command>> {
        let mut workers = self.lock();

        // From here on producers holding the old sender see `Closed` and come
        // back through `acquire`, which waits for this lock.
        queue.close();
        let mut leftovers = Vec::new();
        while let Ok(command) = queue.try_recv() {
            leftovers.push(command);
        }

        let ours = workers
            .get(&chat_id)
            .is_some_and(|slot| slot.generation == generation);

        if leftovers.is_empty() {
            if ours {
                workers.remove(&chat_id);
            }
            return None;
        }

        let (tx, rx) = mpsc::channel(self.cfg.queue_capacity);
        *queue = rx;
        if ours {
            workers.insert(
                chat_id,
                WorkerSlot {
                    generation,
                    queue: tx,
                },
            );
        }
        Some(leftovers)
    }
}
