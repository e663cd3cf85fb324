//! Bot command extraction from inbound messages.
//!
//! Entity offsets and lengths are UTF-16 code units (Telegram convention), so the
//! message text is re-encoded once and every span is sliced from that buffer.

use crate::{
    command::{Command, CommandKind},
    domain::ChatId,
    messaging::types::{Entity, EntityKind, Message, Update},
};

/// Turns messages into the commands addressed to this bot.
#[derive(Clone, Debug)]
pub struct CommandExtractor {
    bot_username: String,
}

impl CommandExtractor {
    /// `bot_username` is the bot's own username, with or without a leading `@`.
    pub fn new(bot_username: impl Into<String>) -> Self {
        let name = bot_username.into();
        Self {
            bot_username: name.trim_start_matches('@').to_string(),
        }
    }

    pub fn bot_username(&self) -> &str {
        &self.bot_username
    }

    /// Commands carried by an update, with the chat they belong to.
    ///
    /// Returns `None` when the update carries no message or yields no command.
    pub fn extract_update(&self, update: &Update) -> Option<(ChatId, Vec<Command>)> {
        let (message, commands) = if let Some(msg) = &update.message {
            (msg, self.extract(msg))
        } else if let Some(msg) = &update.edited_message {
            (msg, self.extract_edited(msg))
        } else {
            return None;
        };

        if commands.is_empty() {
            None
        } else {
            Some((message.chat_id, commands))
        }
    }

    /// Commands in a new message, in entity order.
    pub fn extract(&self, message: &Message) -> Vec<Command> {
        let Some(entities) = message.entities.as_deref() else {
            return Vec::new();
        };
        let text = Utf16Text::new(message.text.as_deref().unwrap_or_default());

        let mut out = Vec::new();
        for (index, entity) in entities.iter().enumerate() {
            if entity.kind != EntityKind::BotCommand {
                continue;
            }
            let Some(kind) = text.slice(entity).and_then(|tok| self.match_token(&tok)) else {
                continue;
            };

            if kind != CommandKind::RunCode {
                out.push(Command::new(kind, message.id));
                continue;
            }

            // `run_cpp` only counts as the leading entity, and then owns every
            // entity after it.
            if index != 0 || entity.offset != 0 {
                continue;
            }
            if let Some(source) = collect_code(&text, &entities[1..]) {
                out.push(Command::run_code(message.id, source));
            }
            break;
        }

        out
    }

    /// Commands in an edited message.
    ///
    /// Only a re-run of `run_cpp` is honored; informational commands are not
    /// re-triggered by edits.
    pub fn extract_edited(&self, message: &Message) -> Vec<Command> {
        let Some(entities) = message.entities.as_deref() else {
            return Vec::new();
        };
        let Some((first, rest)) = entities.split_first() else {
            return Vec::new();
        };
        if first.kind != EntityKind::BotCommand || first.offset != 0 || rest.is_empty() {
            return Vec::new();
        }

        let text = Utf16Text::new(message.text.as_deref().unwrap_or_default());
        let is_run_code = text
            .slice(first)
            .and_then(|tok| self.match_token(&tok))
            .is_some_and(|kind| kind == CommandKind::RunCode);
        if !is_run_code {
            return Vec::new();
        }

        collect_code(&text, rest)
            .map(|source| vec![Command::run_code(message.id, source)])
            .unwrap_or_default()
    }

    /// Match `/name` or `/name@<this bot>` against the command vocabulary.
    fn match_token(&self, token: &str) -> Option<CommandKind> {
        let token = token.strip_prefix('/')?;
        let name = match token.split_once('@') {
            Some((name, target)) => {
                if !target.eq_ignore_ascii_case(&self.bot_username) {
                    return None;
                }
                name
            }
            None => token,
        };
        CommandKind::from_name(name)
    }
}

/// Concatenate code spans, each terminated by a newline.
///
/// `None` if there are no spans or any entity is not a code block.
fn collect_code(text: &Utf16Text, entities: &[Entity]) -> Option<String> {
    if entities.is_empty() {
        return None;
    }

    let mut source = String::new();
    for entity in entities {
        if !entity.kind.is_code_block() {
            return None;
        }
        source.push_str(&text.slice(entity)?);
        source.push('\n');
    }
    Some(source)
}

struct Utf16Text {
    units: Vec<u16>,
}

impl Utf16Text {
    fn new(text: &str) -> Self {
        Self {
            units: text.encode_utf16().collect(),
        }
    }

    fn slice(&self, entity: &Entity) -> Option<String> {
        let end = entity.offset.checked_add(entity.length)?;
        let units = self.units.get(entity.offset..end)?;
        Some(String::from_utf16_lossy(units))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageId, UpdateId};

    fn msg(text: &str, entities: Option<Vec<Entity>>) -> Message {
        Message {
            id: MessageId(7),
            chat_id: ChatId(42),
            text: Some(text.to_string()),
            entities,
        }
    }

    fn utf16_len(s: &str) -> usize {
        s.encode_utf16().count()
    }

    fn extractor() -> CommandExtractor {
        CommandExtractor::new("mybot")
    }

    #[test]
    fn no_entities_yields_nothing() {
        let m = msg("/quote", None);
        assert!(extractor().extract(&m).is_empty());
        assert!(extractor().extract_edited(&m).is_empty());
    }

    #[test]
    fn quote_with_and_without_mention() {
        for text in ["/quote", "/quote@mybot", "/quote@MyBot"] {
            let m = msg(
                text,
                Some(vec![Entity::new(EntityKind::BotCommand, 0, utf16_len(text))]),
            );
            assert_eq!(
                extractor().extract(&m),
                vec![Command::new(CommandKind::Quote, MessageId(7))],
                "{text}"
            );
        }
    }

    #[test]
    fn mention_of_another_bot_is_ignored() {
        let text = "/quote@otherbot";
        let m = msg(
            text,
            Some(vec![Entity::new(EntityKind::BotCommand, 0, utf16_len(text))]),
        );
        assert!(extractor().extract(&m).is_empty());
    }

    #[test]
    fn unknown_commands_are_ignored() {
        let m = msg(
            "/start /joke",
            Some(vec![
                Entity::new(EntityKind::BotCommand, 0, 6),
                Entity::new(EntityKind::BotCommand, 7, 5),
            ]),
        );
        assert_eq!(
            extractor().extract(&m),
            vec![Command::new(CommandKind::Joke, MessageId(7))]
        );
    }

    #[test]
    fn multiple_commands_keep_source_order() {
        let m = msg(
            "/about then /funny_pics and /girl_pics",
            Some(vec![
                Entity::new(EntityKind::BotCommand, 0, 6),
                Entity::new(EntityKind::BotCommand, 12, 11),
                Entity::new(EntityKind::BotCommand, 28, 10),
            ]),
        );
        let kinds: Vec<_> = extractor().extract(&m).into_iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CommandKind::About,
                CommandKind::FunnyPics,
                CommandKind::GirlPics
            ]
        );
    }

    #[test]
    fn offsets_are_utf16_code_units() {
        // The emoji is two UTF-16 units and four UTF-8 bytes.
        let text = "😀 /joke";
        let start = utf16_len("😀 ");
        let m = msg(
            text,
            Some(vec![Entity::new(EntityKind::BotCommand, start, 5)]),
        );
        assert_eq!(
            extractor().extract(&m),
            vec![Command::new(CommandKind::Joke, MessageId(7))]
        );
    }

    #[test]
    fn run_cpp_concatenates_code_and_pre_spans() {
        let text = "/run_cpp int x; 🙂 int main() {}";
        let code_at = utf16_len("/run_cpp ");
        let pre_at = utf16_len("/run_cpp int x; 🙂 ");
        let m = msg(
            text,
            Some(vec![
                Entity::new(EntityKind::BotCommand, 0, 8),
                Entity::new(EntityKind::Code, code_at, utf16_len("int x;")),
                Entity::new(EntityKind::Pre, pre_at, utf16_len("int main() {}")),
            ]),
        );
        assert_eq!(
            extractor().extract(&m),
            vec![Command::run_code(
                MessageId(7),
                "int x;\nint main() {}\n".to_string()
            )]
        );
    }

    #[test]
    fn run_cpp_with_foreign_entity_is_dropped() {
        let m = msg(
            "/run_cpp x #tag",
            Some(vec![
                Entity::new(EntityKind::BotCommand, 0, 8),
                Entity::new(EntityKind::Code, 9, 1),
                Entity::new(EntityKind::Other("hashtag".to_string()), 11, 4),
            ]),
        );
        assert!(extractor().extract(&m).is_empty());
    }

    #[test]
    fn run_cpp_without_code_or_not_leading_is_dropped() {
        let bare = msg(
            "/run_cpp",
            Some(vec![Entity::new(EntityKind::BotCommand, 0, 8)]),
        );
        assert!(extractor().extract(&bare).is_empty());

        let trailing = msg(
            "/joke /run_cpp x",
            Some(vec![
                Entity::new(EntityKind::BotCommand, 0, 5),
                Entity::new(EntityKind::BotCommand, 6, 8),
                Entity::new(EntityKind::Code, 15, 1),
            ]),
        );
        assert_eq!(
            extractor().extract(&trailing),
            vec![Command::new(CommandKind::Joke, MessageId(7))]
        );
    }

    #[test]
    fn out_of_range_entity_is_skipped() {
        let m = msg(
            "/quote",
            Some(vec![Entity::new(EntityKind::BotCommand, 3, 40)]),
        );
        assert!(extractor().extract(&m).is_empty());
    }

    #[test]
    fn edits_only_rerun_code() {
        let quote = msg(
            "/quote x",
            Some(vec![
                Entity::new(EntityKind::BotCommand, 0, 6),
                Entity::new(EntityKind::Code, 7, 1),
            ]),
        );
        assert!(extractor().extract_edited(&quote).is_empty());

        let run = msg(
            "/run_cpp@mybot x",
            Some(vec![
                Entity::new(EntityKind::BotCommand, 0, 14),
                Entity::new(EntityKind::Code, 15, 1),
            ]),
        );
        assert_eq!(
            extractor().extract_edited(&run),
            vec![Command::run_code(MessageId(7), "x\n".to_string())]
        );
    }

    #[test]
    fn update_routes_edited_messages_through_edit_rules() {
        let about = msg(
            "/about",
            Some(vec![Entity::new(EntityKind::BotCommand, 0, 6)]),
        );
        let fresh = Update {
            id: UpdateId(1),
            message: Some(about.clone()),
            edited_message: None,
        };
        let edited = Update {
            id: UpdateId(2),
            message: None,
            edited_message: Some(about),
        };

        let (chat, commands) = extractor().extract_update(&fresh).unwrap();
        assert_eq!(chat, ChatId(42));
        assert_eq!(commands.len(), 1);
        assert!(extractor().extract_update(&edited).is_none());
    }
}
