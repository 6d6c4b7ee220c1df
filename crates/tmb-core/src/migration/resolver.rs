use serde::Serialize;
use tracing::{info, warn};

use crate::{
    domain::{ChannelId, ThreadHandle, ThreadSpec, Visibility},
    messaging::{port::ChatPlatform, types::OutgoingMessage},
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ThreadStatus {
    Found,
    Created,
}

#[derive(Clone, Debug)]
pub struct Resolved {
    pub thread: ThreadHandle,
    pub status: ThreadStatus,
}

pub struct ThreadResolver<'a> {
    platform: &'a dyn ChatPlatform,
}

impl<'a> ThreadResolver<'a> {
    pub fn new(platform: &'a dyn ChatPlatform) -> Self {
        Self { platform }
    }

    /// Reuse an active thread whose name matches (case-insensitively), or
    /// create one. `announcement` is the anchor text for public threads.
    pub async fn resolve(
        &self,
        channel: ChannelId,
        spec: &ThreadSpec,
        announcement: &str,
    ) -> Result<Resolved> {
        let active = self.platform.active_threads(channel).await?;
        // First match in enumeration order; duplicates are not disambiguated.
        if let Some(thread) = active
            .into_iter()
            .find(|t| !t.archived && spec.matches(&t.name))
        {
            info!(thread = %thread.id, name = %thread.name, "reusing existing thread");
            return Ok(Resolved {
                thread,
                status: ThreadStatus::Found,
            });
        }

        let thread = match spec.visibility {
            Visibility::Public => self.create_anchored(channel, &spec.name, announcement).await?,
            Visibility::Private => {
                self.platform
                    .create_private_thread(channel, &spec.name)
                    .await?
            }
        };
        info!(
            thread = %thread.id,
            name = %thread.name,
            visibility = spec.visibility.as_str(),
            "created thread"
        );
        Ok(Resolved {
            thread,
            status: ThreadStatus::Created,
        })
    }

    /// Public threads must start from a channel message. The anchor is removed
    /// again whether or not creation succeeded.
    async fn create_anchored(
        &self,
        channel: ChannelId,
        name: &str,
        announcement: &str,
    ) -> Result<ThreadHandle> {
        let anchor = self
            .platform
            .send_message(channel, OutgoingMessage::text(announcement))
            .await?;

        let created = self
            .platform
            .create_thread_from_message(channel, anchor, name)
            .await;

        if let Err(e) = self.platform.delete_message(channel, anchor).await {
            if !e.is_not_found() {
                warn!(anchor = %anchor, error = %e, "failed to delete thread anchor");
            }
        }

        created
    }
}
