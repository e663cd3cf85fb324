//! Telegram adapter (teloxide).
//!
//! This crate implements the `omb-core` ChatTransport over the Telegram Bot API.

use std::time::Duration;

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{
        InputFile, Message, MessageEntity, MessageEntityKind, ParseMode as TgParseMode, Update,
        UpdateKind,
    },
};

use tokio::time::sleep;
use tracing::debug;

use omb_core::{
    config::Config,
    domain::{ChatId, MessageId, UpdateId},
    errors::Error,
    messaging::{
        port::ChatTransport,
        types::{
            Entity, EntityKind, Message as CoreMessage, ParseMode, SendOptions,
            Update as CoreUpdate,
        },
    },
    Result,
};

/// Slack on top of the long-poll timeout before the HTTP client gives up.
const HTTP_TIMEOUT_SLACK: Duration = Duration::from_secs(7);

#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
    poll_timeout: Duration,
}

impl TelegramTransport {
    pub fn new(bot: Bot, poll_timeout: Duration) -> Self {
        Self { bot, poll_timeout }
    }

    /// Build a bot client from config, routing through `http_proxy` when set.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(cfg.poll_timeout + HTTP_TIMEOUT_SLACK)
            .tcp_nodelay(true);

        if let Some(proxy) = &cfg.http_proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| Error::Config(format!("invalid http proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;

        Ok(Self::new(
            Bot::with_client(cfg.telegram_bot_token.clone(), client),
            cfg.poll_timeout,
        ))
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn get_me(&self) -> Result<String> {
        let me = self.bot.get_me().await.map_err(Self::map_err)?;
        Ok(me.username().to_string())
    }

    async fn fetch_updates(&self, offset: Option<UpdateId>) -> Result<Vec<CoreUpdate>> {
        let timeout_secs = u32::try_from(self.poll_timeout.as_secs()).unwrap_or(u32::MAX);
        let mut req = self.bot.get_updates().timeout(timeout_secs);
        if let Some(offset) = offset {
            req = req.offset(offset.0);
        }

        let updates = req.await.map_err(Self::map_err)?;
        debug!(count = updates.len(), "fetched updates");

        Ok(updates.into_iter().map(to_core_update).collect())
    }

    async fn send_text(&self, chat_id: ChatId, text: &str, opts: SendOptions) -> Result<()> {
        self.with_retry(|| {
            let mut req = self.bot.send_message(Self::tg_chat(chat_id), text.to_string());
            if let Some(reply_to) = opts.reply_to {
                req = req.reply_to_message_id(Self::tg_msg_id(reply_to));
            }
            if let Some(mode) = opts.parse_mode {
                req = req.parse_mode(match mode {
                    ParseMode::Html => TgParseMode::Html,
                });
            }
            req
        })
        .await?;
        Ok(())
    }

    async fn send_document(&self, chat_id: ChatId, uri: &str) -> Result<()> {
        let url = reqwest::Url::parse(uri)
            .map_err(|e| Error::Transport(format!("invalid document uri {uri}: {e}")))?;
        self.with_retry(|| {
            self.bot
                .send_document(Self::tg_chat(chat_id), InputFile::url(url.clone()))
        })
        .await?;
        Ok(())
    }
}

fn to_core_update(update: Update) -> CoreUpdate {
    let id = UpdateId(update.id);
    match update.kind {
        UpdateKind::Message(msg) => CoreUpdate {
            id,
            message: Some(to_core_message(&msg)),
            edited_message: None,
        },
        UpdateKind::EditedMessage(msg) => CoreUpdate {
            id,
            message: None,
            edited_message: Some(to_core_message(&msg)),
        },
        _ => CoreUpdate {
            id,
            message: None,
            edited_message: None,
        },
    }
}

fn to_core_message(msg: &Message) -> CoreMessage {
    CoreMessage {
        id: MessageId(msg.id.0),
        chat_id: ChatId(msg.chat.id.0),
        text: msg.text().map(str::to_string),
        entities: msg
            .entities()
            .map(|entities| entities.iter().map(to_core_entity).collect()),
    }
}

fn to_core_entity(entity: &MessageEntity) -> Entity {
    Entity::new(entity_kind(&entity.kind), entity.offset, entity.length)
}

fn entity_kind(kind: &MessageEntityKind) -> EntityKind {
    match kind {
        MessageEntityKind::BotCommand => EntityKind::BotCommand,
        MessageEntityKind::Code => EntityKind::Code,
        MessageEntityKind::Pre { .. } => EntityKind::Pre,
        other => EntityKind::Other(format!("{other:?}")),
    }
}
