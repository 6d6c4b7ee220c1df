use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;

use serenity::{
    builder::{
        CreateAllowedMentions, CreateInteractionResponseFollowup, CreateMessage,
        EditInteractionResponse,
    },
    http::Http,
    model::application::CommandInteraction,
};

use tmb_core::{
    errors::Error,
    formatting::split_message,
    messaging::{
        port::InvocationContext,
        types::{PlatformCapabilities, ReportDelivery},
    },
    Result,
};

/// One `/move` invocation. Remembers whether the deferred reply was ephemeral so
/// overflow chunks follow the same visibility.
pub struct InteractionContext {
    http: Arc<Http>,
    command: CommandInteraction,
    ephemeral: AtomicBool,
}

impl InteractionContext {
    pub fn new(http: Arc<Http>, command: CommandInteraction) -> Self {
        Self {
            http,
            command,
            ephemeral: AtomicBool::new(false),
        }
    }

    fn chunks(text: &str) -> Vec<String> {
        split_message(text, PlatformCapabilities::discord().max_message_len)
    }

    async fn edit_acknowledgment(&self, text: &str) -> Result<()> {
        let mut chunks = Self::chunks(text).into_iter();
        let first = chunks.next().unwrap_or_default();
        self.command
            .edit_response(
                &self.http,
                EditInteractionResponse::new()
                    .content(first)
                    .allowed_mentions(CreateAllowedMentions::new()),
            )
            .await
            .map_err(map_err)?;

        let ephemeral = self.ephemeral.load(Ordering::Relaxed);
        for chunk in chunks {
            self.command
                .create_followup(
                    &self.http,
                    CreateInteractionResponseFollowup::new()
                        .content(chunk)
                        .ephemeral(ephemeral)
                        .allowed_mentions(CreateAllowedMentions::new()),
                )
                .await
                .map_err(map_err)?;
        }
        Ok(())
    }

    async fn broadcast(&self, text: &str) -> Result<()> {
        for chunk in Self::chunks(text) {
            self.command
                .channel_id
                .send_message(
                    &self.http,
                    CreateMessage::new()
                        .content(chunk)
                        .allowed_mentions(CreateAllowedMentions::new()),
                )
                .await
                .map_err(map_err)?;
        }
        Ok(())
    }
}

fn map_err(e: serenity::Error) -> Error {
    Error::Platform(format!("interaction response failed: {e}"))
}

#[async_trait]
impl InvocationContext for InteractionContext {
    async fn acknowledge(&self, ephemeral: bool) -> Result<()> {
        self.ephemeral.store(ephemeral, Ordering::Relaxed);
        let res = if ephemeral {
            self.command.defer_ephemeral(&self.http).await
        } else {
            self.command.defer(&self.http).await
        };
        res.map_err(map_err)
    }

    async fn report(&self, text: &str, delivery: ReportDelivery) -> Result<()> {
        match delivery {
            ReportDelivery::EditAcknowledgment => self.edit_acknowledgment(text).await,
            ReportDelivery::Broadcast => self.broadcast(text).await,
        }
    }

    async fn retract_acknowledgment(&self) -> Result<()> {
        self.command
            .delete_response(&self.http)
            .await
            .map_err(map_err)
    }
}
