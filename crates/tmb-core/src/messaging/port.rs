use async_trait::async_trait;

use crate::{
    domain::{Attachment, ChannelId, MessageId, SourceMessage, ThreadHandle, UserId},
    messaging::types::{OutgoingMessage, PlatformCapabilities, ReportDelivery},
    Result,
};

/// Chat platform port.
///
/// Discord is the only implementation; the migration pipeline talks to the
/// platform exclusively through this trait so it can be driven by an in-memory
/// fake in tests.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    fn capabilities(&self) -> PlatformCapabilities;

    /// The account the bot is acting as.
    async fn current_user(&self) -> Result<UserId>;

    /// One page of history, newest first, strictly older than `before` when set.
    async fn fetch_history(
        &self,
        channel: ChannelId,
        before: Option<MessageId>,
        limit: usize,
    ) -> Result<Vec<SourceMessage>>;

    async fn fetch_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>>;

    async fn send_message(&self, channel: ChannelId, msg: OutgoingMessage) -> Result<MessageId>;

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<()>;

    /// Delete up to `capabilities().bulk_delete_limit` messages in one request.
    async fn bulk_delete(&self, channel: ChannelId, messages: &[MessageId]) -> Result<()>;

    /// Active threads visible from `channel`, in platform enumeration order.
    async fn active_threads(&self, channel: ChannelId) -> Result<Vec<ThreadHandle>>;

    async fn create_thread_from_message(
        &self,
        channel: ChannelId,
        anchor: MessageId,
        name: &str,
    ) -> Result<ThreadHandle>;

    async fn create_private_thread(&self, channel: ChannelId, name: &str) -> Result<ThreadHandle>;

    /// Whether the bot may delete other users' messages in `channel`.
    async fn can_delete_messages(&self, channel: ChannelId) -> Result<bool>;
}

/// The invocation that triggered a migration (a slash command on Discord).
#[async_trait]
pub trait InvocationContext: Send + Sync {
    async fn acknowledge(&self, ephemeral: bool) -> Result<()>;

    async fn report(&self, text: &str, delivery: ReportDelivery) -> Result<()>;

    async fn retract_acknowledgment(&self) -> Result<()>;
}
