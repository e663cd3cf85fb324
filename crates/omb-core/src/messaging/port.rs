use async_trait::async_trait;

use crate::{
    domain::{ChatId, UpdateId},
    messaging::types::{SendOptions, Update},
    Result,
};

/// Chat platform port.
///
/// Telegram is the only implementation; the dispatch engine and handlers only
/// ever talk to the platform through this trait.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Username of the bot account (without the leading `@`).
    async fn get_me(&self) -> Result<String>;

    /// Long-poll for updates with id `>= offset`. May block for a polling period.
    async fn fetch_updates(&self, offset: Option<UpdateId>) -> Result<Vec<Update>>;

    async fn send_text(&self, chat_id: ChatId, text: &str, opts: SendOptions) -> Result<()>;

    /// Send a remote file (by URI) as a document attachment.
    async fn send_document(&self, chat_id: ChatId, uri: &str) -> Result<()>;
}
