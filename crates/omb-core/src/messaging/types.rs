use crate::domain::{ChatId, MessageId, UpdateId};

/// One inbound notification from the chat platform.
///
/// By platform contract at most one of `message` / `edited_message` is set.
#[derive(Clone, Debug)]
pub struct Update {
    pub id: UpdateId,
    pub message: Option<Message>,
    pub edited_message: Option<Message>,
}

/// Inbound message. Entity offsets index `text` in UTF-16 code units.
#[derive(Clone, Debug)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub text: Option<String>,
    pub entities: Option<Vec<Entity>>,
}

/// Tagged span over message text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    pub kind: EntityKind,
    pub offset: usize,
    pub length: usize,
}

impl Entity {
    pub fn new(kind: EntityKind, offset: usize, length: usize) -> Self {
        Self {
            kind,
            offset,
            length,
        }
    }
}

/// Entity type tag. Only the tags the extractor looks at get their own variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntityKind {
    BotCommand,
    Code,
    Pre,
    Other(String),
}

impl EntityKind {
    /// Map a platform type tag (`"bot_command"`, `"code"`, ...) to a kind.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "bot_command" => Self::BotCommand,
            "code" => Self::Code,
            "pre" => Self::Pre,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_code_block(&self) -> bool {
        matches!(self, Self::Code | Self::Pre)
    }
}

/// Outbound text formatting mode. Plain text when unset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseMode {
    Html,
}

/// Options for an outbound text message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub reply_to: Option<MessageId>,
    pub parse_mode: Option<ParseMode>,
}

impl SendOptions {
    pub fn html() -> Self {
        Self {
            reply_to: None,
            parse_mode: Some(ParseMode::Html),
        }
    }

    pub fn replying_to(mut self, message_id: MessageId) -> Self {
        self.reply_to = Some(message_id);
        self
    }
}
