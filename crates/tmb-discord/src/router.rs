use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};

use async_trait::async_trait;

use serenity::{
    builder::{CreateInteractionResponse, CreateInteractionResponseMessage},
    client::{Client, Context, EventHandler},
    model::{
        application::{Command, CommandInteraction, Interaction},
        gateway::{GatewayIntents, Ready},
        id::GuildId,
    },
};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, warn};

use tmb_core::{
    config::Config,
    domain::{ChannelId, MessageId, UserId},
    migration::MigrationCoordinator,
};

use crate::{
    commands::{create_commands, MoveArgs, MOVE_COMMAND},
    context::InteractionContext,
    DiscordPlatform,
};

/// Serializes migrations per source channel so two `/move` runs never
/// interleave their collect and delete phases.
///
/// Entries are created on first use and kept for the life of the process; one
/// idle mutex per channel the bot has been invoked in.
#[derive(Default)]
pub struct ChannelLocks {
    inner: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl ChannelLocks {
    pub async fn lock_channel(&self, channel_id: u64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(channel_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub struct Handler {
    cfg: Arc<Config>,
    files: reqwest::Client,
    locks: ChannelLocks,
    me: OnceLock<UserId>,
}

impl Handler {
    pub fn new(cfg: Arc<Config>) -> Self {
        Self {
            cfg,
            files: reqwest::Client::new(),
            locks: ChannelLocks::default(),
            me: OnceLock::new(),
        }
    }

    async fn current_user(&self, ctx: &Context) -> Option<UserId> {
        if let Some(me) = self.me.get() {
            return Some(*me);
        }
        match ctx.http.get_current_user().await {
            Ok(user) => Some(*self.me.get_or_init(|| UserId(user.id.get()))),
            Err(e) => {
                error!(error = %e, "failed to resolve bot user");
                None
            }
        }
    }

    async fn handle_move(&self, ctx: &Context, command: CommandInteraction) {
        let channel = ChannelId(command.channel_id.get());
        let invocation_id = MessageId(command.id.get());
        let max_count = self.cfg.migration.max_count;
        let req = match MoveArgs::from_options(&command.data.options).into_request(
            channel,
            invocation_id,
            max_count,
        ) {
            Ok(req) => req,
            Err(e) => {
                info!(channel = %channel, error = %e, "rejected /move invocation");
                reply_ephemeral(ctx, &command, &e.to_string()).await;
                return;
            }
        };

        let Some(me) = self.current_user(ctx).await else {
            reply_ephemeral(ctx, &command, "I'm not ready yet; try again in a moment.").await;
            return;
        };

        let platform = DiscordPlatform::new(ctx.http.clone(), self.files.clone(), me)
            .with_app_permissions(command.app_permissions);
        let coordinator =
            MigrationCoordinator::new(Arc::new(platform), self.cfg.migration_settings());
        let invocation = InteractionContext::new(ctx.http.clone(), command);

        // Deferred before queueing behind another run on the same channel.
        coordinator
            .execute_when(&req, &invocation, self.locks.lock_channel(channel.0))
            .await;
    }
}

async fn reply_ephemeral(ctx: &Context, command: &CommandInteraction, text: &str) {
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(text)
            .ephemeral(true),
    );
    if let Err(e) = command.create_response(&ctx.http, response).await {
        warn!(error = %e, "failed to reply to interaction");
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        let _ = self.me.set(UserId(ready.user.id.get()));
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "connected to Discord");

        let commands = create_commands(self.cfg.migration.max_count);
        let registered = match self.cfg.discord_guild_id {
            Some(guild) => GuildId::new(guild).set_commands(&ctx.http, commands).await,
            None => Command::set_global_commands(&ctx.http, commands).await,
        };
        match registered {
            Ok(cmds) => info!(count = cmds.len(), guild = ?self.cfg.discord_guild_id, "registered slash commands"),
            Err(e) => error!(error = %e, "failed to register slash commands"),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };
        if command.data.name != MOVE_COMMAND {
            warn!(command = %command.data.name, "unknown command");
            return;
        }
        self.handle_move(&ctx, command).await;
    }
}

pub async fn run(cfg: Arc<Config>) -> anyhow::Result<()> {
    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&cfg.discord_token, intents)
        .event_handler(Handler::new(cfg.clone()))
        .await?;

    info!(max_count = cfg.migration.max_count, "starting gateway client");
    client.start().await?;
    Ok(())
}
