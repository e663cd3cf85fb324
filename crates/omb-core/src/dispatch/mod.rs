//! Per-chat dispatch engine.
//!
//! Every chat with recent activity owns one worker task draining a bounded
//! queue in order. Workers are created lazily by the [`WorkerRegistry`] and
//! retire themselves after an idle window.

use std::time::Duration;

mod registry;
mod worker;

pub use registry::{DispatchReport, WorkerRegistry};

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerConfig {
    /// How long a worker waits on an empty queue before retiring.
    pub idle_timeout: Duration,
    /// Outstanding commands per chat; anything beyond is dropped.
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl From<&crate::config::Config> for WorkerConfig {
    fn from(cfg: &crate::config::Config) -> Self {
        Self {
            idle_timeout: cfg.worker_idle_timeout,
            queue_capacity: cfg.worker_queue_capacity.max(1),
        }
    }
}
