use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::Error;

/// Platform user id (Discord snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UserId(pub u64);

/// Platform channel id. Threads are channels too.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChannelId(pub u64);

/// Platform message id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MessageId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    pub display_name: String,
    /// Platform-specific mention markup (`<@123>` on Discord).
    pub mention: String,
    pub is_bot: bool,
}

/// An attachment on a source message. The bytes are fetched lazily through the
/// platform port when the message is replayed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
    pub size: u64,
}

/// Immutable snapshot of a message collected from the source channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceMessage {
    pub id: MessageId,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    pub content: Option<String>,
    pub attachments: Vec<Attachment>,
    pub embed_count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl FromStr for Visibility {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(Error::InvalidRequest(format!(
                "visibility must be `public` or `private`, got `{other}`"
            ))),
        }
    }
}

/// Maximum thread name length accepted by Discord.
pub const MAX_THREAD_NAME_LEN: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadSpec {
    pub name: String,
    pub visibility: Visibility,
}

impl ThreadSpec {
    pub fn new(name: &str, visibility: Visibility) -> crate::Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidRequest(
                "thread name must not be empty".to_string(),
            ));
        }
        if name.chars().count() > MAX_THREAD_NAME_LEN {
            return Err(Error::InvalidRequest(format!(
                "thread name must be at most {MAX_THREAD_NAME_LEN} characters"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            visibility,
        })
    }

    /// Case-insensitive comparison used for reusing an existing thread.
    pub fn matches(&self, other_name: &str) -> bool {
        self.name.to_lowercase() == other_name.trim().to_lowercase()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadOwnership {
    /// Pre-existing thread; the migration only posts into it.
    Borrowed,
    /// Thread created by this migration, owned by the parent channel.
    Created,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ThreadHandle {
    pub id: ChannelId,
    pub name: String,
    pub archived: bool,
    pub jump_url: String,
    pub ownership: ThreadOwnership,
}
