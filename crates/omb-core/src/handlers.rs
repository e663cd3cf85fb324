//! Command execution: fetch content for a command and reply in the chat.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    command::{Command, CommandKind},
    domain::ChatId,
    formatting::{format_code_output, format_quote, is_gif_uri},
    messaging::{port::ChatTransport, types::SendOptions},
    ports::{CommandExecutor, ContentProvider, PictureKind},
    Result,
};

const NO_OUTPUT: &str = "<i>no output</i>";

/// Default `CommandExecutor`: one content fetch, then best-effort replies.
pub struct CommandHandlers {
    transport: Arc<dyn ChatTransport>,
    content: Arc<dyn ContentProvider>,
    about_url: String,
    message_limit: usize,
}

impl CommandHandlers {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        content: Arc<dyn ContentProvider>,
        about_url: impl Into<String>,
        message_limit: usize,
    ) -> Self {
        Self {
            transport,
            content,
            about_url: about_url.into(),
            message_limit,
        }
    }

    async fn send_pictures(&self, chat_id: ChatId, kind: PictureKind) {
        let Some(uris) = self.content.pictures(kind).await else {
            return;
        };
        for uri in uris {
            let sent = if is_gif_uri(&uri) {
                self.transport.send_document(chat_id, &uri).await
            } else {
                self.transport
                    .send_text(chat_id, &uri, SendOptions::default())
                    .await
            };
            log_send_failure(chat_id, CommandKind::from(kind), sent);
        }
    }

    async fn run_code(&self, chat_id: ChatId, command: &Command) {
        let Some(source) = command.payload.as_deref() else {
            return;
        };
        let Some(output) = self.content.run_code(source).await else {
            return;
        };

        let mut reply = format_code_output(&output, self.message_limit);
        if reply.is_empty() {
            reply = NO_OUTPUT.to_string();
        }
        let sent = self
            .transport
            .send_text(
                chat_id,
                &reply,
                SendOptions::html().replying_to(command.origin),
            )
            .await;
        log_send_failure(chat_id, command.kind, sent);
    }
}

#[async_trait]
impl CommandExecutor for CommandHandlers {
    async fn execute(&self, chat_id: ChatId, command: Command) {
        debug!(chat_id = chat_id.0, command = %command.kind, "executing command");

        match command.kind {
            CommandKind::Quote => {
                if let Some(quote) = self.content.quote().await {
                    let sent = self
                        .transport
                        .send_text(chat_id, &format_quote(&quote), SendOptions::html())
                        .await;
                    log_send_failure(chat_id, command.kind, sent);
                }
            }
            CommandKind::Joke => {
                if let Some(joke) = self.content.joke().await {
                    let sent = self
                        .transport
                        .send_text(chat_id, &joke, SendOptions::default())
                        .await;
                    log_send_failure(chat_id, command.kind, sent);
                }
            }
            CommandKind::FunnyPics => self.send_pictures(chat_id, PictureKind::Funny).await,
            CommandKind::GirlPics => self.send_pictures(chat_id, PictureKind::Girls).await,
            CommandKind::RunCode => self.run_code(chat_id, &command).await,
            CommandKind::About => {
                let sent = self
                    .transport
                    .send_text(chat_id, &self.about_url, SendOptions::default())
                    .await;
                log_send_failure(chat_id, command.kind, sent);
            }
        }
    }
}

impl From<PictureKind> for CommandKind {
    fn from(kind: PictureKind) -> Self {
        match kind {
            PictureKind::Funny => CommandKind::FunnyPics,
            PictureKind::Girls => CommandKind::GirlPics,
        }
    }
}

// Replies are fire-and-forget; a failed send is logged and dropped.
fn log_send_failure(chat_id: ChatId, kind: CommandKind, sent: Result<()>) {
    if let Err(e) = sent {
        warn!(chat_id = chat_id.0, command = %kind, "reply failed: {e}");
    }
}
