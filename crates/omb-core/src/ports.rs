use async_trait::async_trait;

use crate::{command::Command, domain::ChatId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quote {
    pub text: String,
    pub author: String,
}

/// Which picture feed to sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PictureKind {
    Funny,
    Girls,
}

/// Content sources behind the informational commands.
///
/// Every call is best-effort: `None` means "nothing to reply with" (rate limit,
/// network failure, upstream parse failure) and is not an error. Implementations
/// log their own failures and never surface them here.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn quote(&self) -> Option<Quote>;
    async fn joke(&self) -> Option<String>;
    async fn pictures(&self, kind: PictureKind) -> Option<Vec<String>>;
    /// Compile and run `source` remotely, returning the combined output.
    async fn run_code(&self, source: &str) -> Option<String>;
}

/// Runs one command for one chat. Called by chat workers, one command at a time.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, chat_id: ChatId, command: Command);
}
