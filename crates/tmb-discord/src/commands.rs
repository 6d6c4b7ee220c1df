//! `/move` slash command registration and argument parsing.

use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{
        application::{CommandDataOption, CommandDataOptionValue, CommandOptionType},
        permissions::Permissions,
    },
};

use tmb_core::{
    domain::{ChannelId, MessageId, ThreadSpec, Visibility, MAX_THREAD_NAME_LEN},
    migration::MigrationRequest,
    Result,
};

pub const MOVE_COMMAND: &str = "move";

pub fn create_commands(max_count: u32) -> Vec<CreateCommand> {
    vec![CreateCommand::new(MOVE_COMMAND)
        .description("Move recent messages into a thread")
        .dm_permission(false)
        .default_member_permissions(Permissions::MANAGE_MESSAGES)
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Integer,
                "count",
                "How many recent messages to move",
            )
            .required(true)
            .min_int_value(1)
            .max_int_value(max_count as u64),
        )
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "thread_name",
                "Destination thread (reused if one with this name exists)",
            )
            .required(true)
            .max_length(MAX_THREAD_NAME_LEN as u16),
        )
        .add_option(visibility_option(
            "privacy",
            "Is the thread public or private? (default: public)",
        ))
        .add_option(visibility_option(
            "response",
            "Who sees the result? (default: public)",
        ))
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Boolean,
                "silent",
                "Keep the command out of the channel (default: false)",
            )
            .required(false),
        )]
}

fn visibility_option(name: &str, description: &str) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::String, name, description)
        .required(false)
        .add_string_choice("public", "public")
        .add_string_choice("private", "private")
}

/// `/move` options as Discord delivered them, before validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveArgs {
    pub count: Option<i64>,
    pub thread_name: Option<String>,
    pub privacy: Option<String>,
    pub response: Option<String>,
    pub silent: Option<bool>,
}

impl MoveArgs {
    pub fn from_options(options: &[CommandDataOption]) -> Self {
        let mut args = Self::default();
        for opt in options {
            match (opt.name.as_str(), &opt.value) {
                ("count", CommandDataOptionValue::Integer(n)) => args.count = Some(*n),
                ("thread_name", CommandDataOptionValue::String(s)) => {
                    args.thread_name = Some(s.clone())
                }
                ("privacy", CommandDataOptionValue::String(s)) => args.privacy = Some(s.clone()),
                ("response", CommandDataOptionValue::String(s)) => args.response = Some(s.clone()),
                ("silent", CommandDataOptionValue::Boolean(b)) => args.silent = Some(*b),
                _ => {}
            }
        }
        args
    }

    /// Validate into a core request. Discord enforces most of this already;
    /// the checks here guard against stale command registrations.
    ///
    /// `invocation` is the interaction's snowflake; history is collected from
    /// before it so the bot's own reply is never part of the move.
    pub fn into_request(
        self,
        channel: ChannelId,
        invocation: MessageId,
        max_count: u32,
    ) -> Result<MigrationRequest> {
        let privacy = parse_visibility(self.privacy.as_deref())?;
        let response = parse_visibility(self.response.as_deref())?;
        let thread = ThreadSpec::new(self.thread_name.as_deref().unwrap_or(""), privacy)?;
        MigrationRequest::new(
            channel,
            self.count.unwrap_or(0),
            max_count,
            thread,
            response,
            self.silent.unwrap_or(false),
        )
        .map(|req| req.with_history_before(invocation))
    }
}

fn parse_visibility(raw: Option<&str>) -> Result<Visibility> {
    match raw {
        None => Ok(Visibility::Public),
        Some(s) => s.parse(),
    }
}
