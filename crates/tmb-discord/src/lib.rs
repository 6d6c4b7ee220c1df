//! Discord adapter (serenity).
//!
//! This crate implements the `tmb-core` ChatPlatform port over the Discord HTTP API.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use serenity::{
    builder::{CreateAllowedMentions, CreateAttachment, CreateMessage, CreateThread, GetMessages},
    http::{Http, HttpError},
    model::{
        channel::{ChannelType, GuildChannel, Message},
        id::{ChannelId as DcChannelId, MessageId as DcMessageId},
        mention::Mentionable,
        permissions::Permissions,
    },
};

use tokio::time::sleep;

pub mod commands;
pub mod context;
pub mod router;

use tmb_core::{
    domain::{
        Attachment, Author, ChannelId, MessageId, SourceMessage, ThreadHandle, ThreadOwnership,
        UserId,
    },
    errors::Error,
    messaging::{
        port::ChatPlatform,
        types::{OutgoingMessage, PlatformCapabilities},
    },
    Result,
};

/// Discord epoch (2015-01-01T00:00:00Z) in unix milliseconds.
const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

#[derive(Clone)]
pub struct DiscordPlatform {
    http: Arc<Http>,
    files: reqwest::Client,
    me: UserId,
    /// The bot's permissions in the invoking channel, as reported by the interaction.
    app_permissions: Option<Permissions>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>, files: reqwest::Client, me: UserId) -> Self {
        Self {
            http,
            files,
            me,
            app_permissions: None,
        }
    }

    pub fn with_app_permissions(mut self, perms: Option<Permissions>) -> Self {
        self.app_permissions = perms;
        self
    }

    fn dc_channel(channel: ChannelId) -> DcChannelId {
        DcChannelId::new(channel.0)
    }

    fn dc_message(message: MessageId) -> DcMessageId {
        DcMessageId::new(message.0)
    }

    fn map_err(e: serenity::Error) -> Error {
        if let serenity::Error::Http(http) = &e {
            if let Some((status, code)) = http_details(http) {
                return classify(status, code, &e.to_string());
            }
        }
        Error::Platform(format!("discord error: {e}"))
    }

    /// Serenity already waits out 429s; retry once on a gateway-side 5xx.
    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::Future<Output = serenity::Result<T>> + Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    let transient = matches!(
                        &e,
                        serenity::Error::Http(http)
                            if http_details(http).map(|(s, _)| s >= 500).unwrap_or(false)
                    );
                    if transient && attempts < MAX_RETRIES {
                        attempts += 1;
                        sleep(Duration::from_millis(500)).await;
                        continue;
                    }
                    return Err(Self::map_err(e));
                }
            }
        }
    }

    fn thread_handle(gc: GuildChannel, ownership: ThreadOwnership) -> ThreadHandle {
        ThreadHandle {
            id: ChannelId(gc.id.get()),
            jump_url: jump_url(gc.guild_id.get(), gc.id.get()),
            archived: gc.thread_metadata.map(|m| m.archived).unwrap_or(false),
            name: gc.name,
            ownership,
        }
    }
}

fn http_details(err: &HttpError) -> Option<(u16, isize)> {
    match err {
        HttpError::UnsuccessfulRequest(resp) => Some((resp.status_code.as_u16(), resp.error.code)),
        _ => None,
    }
}

/// Map a Discord HTTP failure onto the core taxonomy.
pub(crate) fn classify(status: u16, code: isize, detail: &str) -> Error {
    match (status, code) {
        // Missing Access / Missing Permissions
        (403, _) | (_, 50001) | (_, 50013) => Error::PermissionDenied(detail.to_string()),
        // Unknown Channel / Unknown Message
        (404, _) | (_, 10003) | (_, 10008) => Error::NotFound(detail.to_string()),
        _ => Error::Platform(format!("discord error: {detail}")),
    }
}

pub(crate) fn jump_url(guild: u64, channel: u64) -> String {
    format!("https://discord.com/channels/{guild}/{channel}")
}

/// Creation time encoded in a snowflake, millisecond precision.
pub(crate) fn snowflake_time(id: u64) -> DateTime<Utc> {
    let ms = (id >> 22) + DISCORD_EPOCH_MS;
    DateTime::from_timestamp_millis(ms as i64).unwrap_or_default()
}

fn source_message(msg: Message) -> SourceMessage {
    let display_name = msg
        .member
        .as_ref()
        .and_then(|m| m.nick.clone())
        .unwrap_or_else(|| msg.author.display_name().to_string());
    let content = if msg.content.trim().is_empty() {
        None
    } else {
        Some(msg.content.clone())
    };

    SourceMessage {
        id: MessageId(msg.id.get()),
        author: Author {
            id: UserId(msg.author.id.get()),
            display_name,
            mention: msg.author.mention().to_string(),
            is_bot: msg.author.bot,
        },
        created_at: snowflake_time(msg.id.get()),
        content,
        attachments: msg
            .attachments
            .iter()
            .map(|a| Attachment {
                filename: a.filename.clone(),
                url: a.url.clone(),
                size: a.size as u64,
            })
            .collect(),
        embed_count: msg.embeds.len(),
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    fn capabilities(&self) -> PlatformCapabilities {
        PlatformCapabilities::discord()
    }

    async fn current_user(&self) -> Result<UserId> {
        Ok(self.me)
    }

    async fn fetch_history(
        &self,
        channel: ChannelId,
        before: Option<MessageId>,
        limit: usize,
    ) -> Result<Vec<SourceMessage>> {
        let limit = limit.clamp(1, 100) as u8;
        let page = self
            .with_retry(|| {
                let mut req = GetMessages::new().limit(limit);
                if let Some(b) = before {
                    req = req.before(Self::dc_message(b));
                }
                Self::dc_channel(channel).messages(&self.http, req)
            })
            .await?;
        Ok(page.into_iter().map(source_message).collect())
    }

    async fn fetch_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>> {
        let resp = self
            .files
            .get(&attachment.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Platform(format!("attachment download failed: {e}")))?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::Platform(format!("attachment download failed: {e}")))?;
        Ok(bytes.to_vec())
    }

    async fn send_message(&self, channel: ChannelId, msg: OutgoingMessage) -> Result<MessageId> {
        let sent = self
            .with_retry(|| {
                let files: Vec<CreateAttachment> = msg
                    .files
                    .iter()
                    .map(|f| CreateAttachment::bytes(f.data.clone(), f.filename.clone()))
                    .collect();
                let builder = CreateMessage::new()
                    .content(msg.content.clone())
                    .add_files(files)
                    .allowed_mentions(CreateAllowedMentions::new());
                Self::dc_channel(channel).send_message(&self.http, builder)
            })
            .await?;
        Ok(MessageId(sent.id.get()))
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<()> {
        self.with_retry(|| {
            Self::dc_channel(channel).delete_message(&self.http, Self::dc_message(message))
        })
        .await
    }

    async fn bulk_delete(&self, channel: ChannelId, messages: &[MessageId]) -> Result<()> {
        // The bulk endpoint only accepts 2..=100 ids.
        if let [single] = messages {
            return self.delete_message(channel, *single).await;
        }
        let ids: Vec<DcMessageId> = messages.iter().map(|m| Self::dc_message(*m)).collect();
        self.with_retry(|| Self::dc_channel(channel).delete_messages(&self.http, &ids))
            .await
    }

    async fn active_threads(&self, channel: ChannelId) -> Result<Vec<ThreadHandle>> {
        let parent = self
            .with_retry(|| Self::dc_channel(channel).to_channel(&self.http))
            .await?
            .guild()
            .ok_or_else(|| Error::Platform(format!("channel {channel} is not a guild channel")))?;

        let data = self
            .with_retry(|| parent.guild_id.get_active_threads(&self.http))
            .await?;

        Ok(data
            .threads
            .into_iter()
            .filter(|t| t.parent_id == Some(parent.id))
            .map(|t| Self::thread_handle(t, ThreadOwnership::Borrowed))
            .collect())
    }

    async fn create_thread_from_message(
        &self,
        channel: ChannelId,
        anchor: MessageId,
        name: &str,
    ) -> Result<ThreadHandle> {
        let gc = self
            .with_retry(|| {
                Self::dc_channel(channel).create_thread_from_message(
                    &self.http,
                    Self::dc_message(anchor),
                    CreateThread::new(name),
                )
            })
            .await?;
        Ok(Self::thread_handle(gc, ThreadOwnership::Created))
    }

    async fn create_private_thread(&self, channel: ChannelId, name: &str) -> Result<ThreadHandle> {
        let gc = self
            .with_retry(|| {
                Self::dc_channel(channel).create_thread(
                    &self.http,
                    CreateThread::new(name).kind(ChannelType::PrivateThread),
                )
            })
            .await?;
        Ok(Self::thread_handle(gc, ThreadOwnership::Created))
    }

    async fn can_delete_messages(&self, _channel: ChannelId) -> Result<bool> {
        // Without interaction data we cannot tell; the delete requests will.
        Ok(self
            .app_permissions
            .map(|p| p.manage_messages() && p.read_message_history())
            .unwrap_or(true))
    }
}
