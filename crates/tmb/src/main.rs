use std::sync::Arc;

use tmb_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), tmb_core::Error> {
    tmb_core::logging::init("tmb")?;

    let cfg = Arc::new(Config::load()?);
    tracing::info!(
        guild = ?cfg.discord_guild_id,
        max_count = cfg.migration.max_count,
        "configuration loaded"
    );

    tmb_discord::router::run(cfg)
        .await
        .map_err(|e| tmb_core::Error::External(format!("discord bot failed: {e}")))?;

    Ok(())
}
