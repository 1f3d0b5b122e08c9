use async_trait::async_trait;
use wbbot_core::domain::entry::EntryKind;

use crate::client::ChatError;
use crate::events::FileUpload;

/// Keywords that address the bot. Matched with the same prefix rule as
/// commands, so `w` and `/` also count.
pub const INVOCATIONS: [&str; 2] = ["wb", "/wb"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKeyword {
    Register,
    Usage,
    Create(EntryKind),
    UpdateTitle,
    UpdateBody,
    UpdateDate,
    Present,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WhiteboardCommand {
    Register { standup_id: String },
    Usage,
    Create { kind: EntryKind, title: String },
    UpdateTitle { title: String },
    UpdateBody { body: String },
    UpdateDate { date: String },
    Present { num_days: Option<i64> },
    Unknown { remainder: String },
}

/// Keywords in resolution order. A typed token resolves to the first entry
/// it is a prefix of, so earlier entries win ties.
pub struct CommandTable<T> {
    entries: Vec<(&'static str, T)>,
}

impl<T: Copy> CommandTable<T> {
    pub fn new(entries: Vec<(&'static str, T)>) -> Self {
        Self { entries }
    }

    pub fn resolve(&self, typed: &str) -> Option<T> {
        let typed = typed.to_lowercase();
        self.entries
            .iter()
            .find(|(keyword, _)| matches(&typed, keyword))
            .map(|(_, value)| *value)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(keyword, _)| *keyword)
    }
}

impl CommandTable<CommandKeyword> {
    pub fn whiteboard() -> Self {
        Self::new(vec![
            ("register", CommandKeyword::Register),
            ("?", CommandKeyword::Usage),
            ("faces", CommandKeyword::Create(EntryKind::Face)),
            ("helps", CommandKeyword::Create(EntryKind::Help)),
            ("interestings", CommandKeyword::Create(EntryKind::Interesting)),
            ("events", CommandKeyword::Create(EntryKind::Event)),
            ("name", CommandKeyword::UpdateTitle),
            ("title", CommandKeyword::UpdateTitle),
            ("body", CommandKeyword::UpdateBody),
            ("date", CommandKeyword::UpdateDate),
            ("present", CommandKeyword::Present),
        ])
    }
}

/// `typed` abbreviates `keyword` when it is a non-empty prefix of it.
pub fn matches(typed: &str, keyword: &str) -> bool {
    !typed.is_empty() && keyword.starts_with(typed)
}

/// Splits off the first whitespace-delimited token; the remainder is trimmed.
pub fn read_next_command(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.split_once(char::is_whitespace) {
        Some((command, remainder)) => (command, remainder.trim()),
        None => (input.trim_end(), ""),
    }
}

/// Returns the text after the invocation keyword, or `None` when the message
/// is not addressed to the bot.
pub fn strip_invocation(text: &str) -> Option<&str> {
    let (invocation, remainder) = read_next_command(text);
    let invocation = invocation.to_lowercase();
    INVOCATIONS.iter().any(|keyword| matches(&invocation, keyword)).then_some(remainder)
}

pub fn parse_whiteboard_command(
    table: &CommandTable<CommandKeyword>,
    input: &str,
) -> WhiteboardCommand {
    let (token, args) = read_next_command(input);
    let Some(keyword) = table.resolve(token) else {
        return WhiteboardCommand::Unknown { remainder: input.trim().to_owned() };
    };

    let args = args.to_owned();
    match keyword {
        CommandKeyword::Register => WhiteboardCommand::Register { standup_id: args },
        CommandKeyword::Usage => WhiteboardCommand::Usage,
        CommandKeyword::Create(kind) => WhiteboardCommand::Create { kind, title: args },
        CommandKeyword::UpdateTitle => WhiteboardCommand::UpdateTitle { title: args },
        CommandKeyword::UpdateBody => WhiteboardCommand::UpdateBody { body: args },
        CommandKeyword::UpdateDate => WhiteboardCommand::UpdateDate { date: args },
        CommandKeyword::Present => WhiteboardCommand::Present { num_days: args.parse().ok() },
    }
}

/// Where a command came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandContext {
    pub channel_id: String,
    pub user_id: String,
    pub upload: Option<FileUpload>,
    pub correlation_id: String,
}

#[async_trait]
pub trait WhiteboardCommandService: Send + Sync {
    async fn register(&self, standup_id: &str, ctx: &CommandContext) -> Result<(), ChatError>;
    async fn usage(&self, ctx: &CommandContext) -> Result<(), ChatError>;
    async fn create_entry(
        &self,
        kind: EntryKind,
        title: &str,
        ctx: &CommandContext,
    ) -> Result<(), ChatError>;
    async fn update_title(&self, title: &str, ctx: &CommandContext) -> Result<(), ChatError>;
    async fn update_body(&self, body: &str, ctx: &CommandContext) -> Result<(), ChatError>;
    async fn update_date(&self, date: &str, ctx: &CommandContext) -> Result<(), ChatError>;
    async fn present(&self, num_days: Option<i64>, ctx: &CommandContext) -> Result<(), ChatError>;
    async fn fallback(&self, remainder: &str, ctx: &CommandContext) -> Result<(), ChatError>;
}

pub struct CommandRouter<S> {
    table: CommandTable<CommandKeyword>,
    service: S,
}

impl<S> CommandRouter<S>
where
    S: WhiteboardCommandService,
{
    pub fn new(service: S) -> Self {
        Self { table: CommandTable::whiteboard(), service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Handles normalized message text. Returns `false` when the text was not
    /// addressed to the bot.
    pub async fn route_text(&self, text: &str, ctx: &CommandContext) -> Result<bool, ChatError> {
        let Some(inner) = strip_invocation(text) else {
            return Ok(false);
        };
        let command = parse_whiteboard_command(&self.table, inner);
        self.route(command, ctx).await?;
        Ok(true)
    }

    pub async fn route(
        &self,
        command: WhiteboardCommand,
        ctx: &CommandContext,
    ) -> Result<(), ChatError> {
        match command {
            WhiteboardCommand::Register { standup_id } => {
                self.service.register(&standup_id, ctx).await
            }
            WhiteboardCommand::Usage => self.service.usage(ctx).await,
            WhiteboardCommand::Create { kind, title } => {
                self.service.create_entry(kind, &title, ctx).await
            }
            WhiteboardCommand::UpdateTitle { title } => {
                self.service.update_title(&title, ctx).await
            }
            WhiteboardCommand::UpdateBody { body } => self.service.update_body(&body, ctx).await,
            WhiteboardCommand::UpdateDate { date } => self.service.update_date(&date, ctx).await,
            WhiteboardCommand::Present { num_days } => self.service.present(num_days, ctx).await,
            WhiteboardCommand::Unknown { remainder } => {
                self.service.fallback(&remainder, ctx).await
            }
        }
    }
}
