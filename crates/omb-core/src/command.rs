use crate::domain::MessageId;

/// Recognized bot commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Quote,
    Joke,
    FunnyPics,
    GirlPics,
    RunCode,
    About,
}

impl CommandKind {
    pub const ALL: [CommandKind; 6] = [
        Self::Quote,
        Self::Joke,
        Self::FunnyPics,
        Self::GirlPics,
        Self::RunCode,
        Self::About,
    ];

    /// Command name as typed by users, without the leading slash.
    pub fn name(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Joke => "joke",
            Self::FunnyPics => "funny_pics",
            Self::GirlPics => "girl_pics",
            Self::RunCode => "run_cpp",
            Self::About => "about",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One unit of work for a chat worker. Consumed exactly once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    pub origin: MessageId,
    /// Source code for `RunCode`.
    pub payload: Option<String>,
}

impl Command {
    pub fn new(kind: CommandKind, origin: MessageId) -> Self {
        Self {
            kind,
            origin,
            payload: None,
        }
    }

    pub fn run_code(origin: MessageId, source: String) -> Self {
        Self {
            kind: CommandKind::RunCode,
            origin,
            payload: Some(source),
        }
    }
}
