use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

/// Default and hard ceiling for the per-request message count.
pub const MAX_MOVE_COUNT: u32 = 100;

/// Whether the migrating bot's own earlier messages are swept along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelfMessagePolicy {
    /// Treat the bot's own messages like any other bot message (filtered).
    Exclude,
    /// Carry the bot's own messages along even though they are bot-flagged.
    Include,
}

/// Knobs for the migration pipeline. Platform hard limits live in
/// `PlatformCapabilities`; these are policy.
#[derive(Clone, Debug)]
pub struct MigrationSettings {
    pub max_count: u32,
    pub collect_margin: usize,
    pub collect_max_scan: usize,
    pub attachment_cap: usize,
    pub attachment_max_bytes: u64,
    pub delete_pacing: Duration,
    pub self_messages: SelfMessagePolicy,
    /// Anchor text for public threads; `{name}` and `{count}` are substituted.
    pub announcement_template: String,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            max_count: MAX_MOVE_COUNT,
            collect_margin: 20,
            collect_max_scan: 500,
            attachment_cap: 10,
            attachment_max_bytes: 25 * 1024 * 1024,
            delete_pacing: Duration::from_millis(1000),
            self_messages: SelfMessagePolicy::Exclude,
            announcement_template: "Creating thread {name} and moving {count} messages"
                .to_string(),
        }
    }
}

impl MigrationSettings {
    pub fn announcement(&self, name: &str, count: usize) -> String {
        self.announcement_template
            .replace("{name}", name)
            .replace("{count}", &count.to_string())
    }
}

/// Typed process configuration, read from the environment (and `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    pub discord_token: String,
    /// Register slash commands to this guild only (fast propagation while developing).
    pub discord_guild_id: Option<u64>,
    pub migration: MigrationSettings,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let discord_token = get("DISCORD_TOKEN")
            .or_else(|| get("TOKEN"))
            .ok_or_else(|| {
                Error::Config("DISCORD_TOKEN environment variable is required".to_string())
            })?;

        let discord_guild_id = match get("DISCORD_GUILD_ID") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(id) if id > 0 => Some(id),
                _ => {
                    return Err(Error::Config(format!(
                        "DISCORD_GUILD_ID must be a non-zero numeric id, got `{raw}`"
                    )))
                }
            },
            None => None,
        };

        let defaults = MigrationSettings::default();
        let max_count = parse_u64(get("MOVE_MAX_COUNT"))
            .map(|v| v.clamp(1, MAX_MOVE_COUNT as u64) as u32)
            .unwrap_or(defaults.max_count);
        let collect_margin = parse_u64(get("COLLECT_MARGIN"))
            .map(|v| v as usize)
            .unwrap_or(defaults.collect_margin);
        let collect_max_scan = parse_u64(get("COLLECT_MAX_SCAN"))
            .map(|v| (v as usize).max(max_count as usize))
            .unwrap_or(defaults.collect_max_scan);
        let attachment_cap = parse_u64(get("ATTACHMENT_CAP"))
            .map(|v| v as usize)
            .unwrap_or(defaults.attachment_cap);
        let attachment_max_bytes =
            parse_u64(get("ATTACHMENT_MAX_BYTES")).unwrap_or(defaults.attachment_max_bytes);
        let delete_pacing = parse_u64(get("DELETE_PACING_MS"))
            .map(Duration::from_millis)
            .unwrap_or(defaults.delete_pacing);
        let self_messages = match parse_bool(get("EXCLUDE_OWN_MESSAGES")) {
            Some(false) => SelfMessagePolicy::Include,
            _ => SelfMessagePolicy::Exclude,
        };
        let announcement_template =
            get("ANNOUNCEMENT_TEMPLATE").unwrap_or(defaults.announcement_template);

        Ok(Self {
            discord_token,
            discord_guild_id,
            migration: MigrationSettings {
                max_count,
                collect_margin,
                collect_max_scan,
                attachment_cap,
                attachment_max_bytes,
                delete_pacing,
                self_messages,
                announcement_template,
            },
        })
    }

    pub fn migration_settings(&self) -> MigrationSettings {
        self.migration.clone()
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, strip_quotes(v.trim()));
    }
}

fn strip_quotes(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return &val[1..val.len() - 1];
    }
    val
}

fn parse_bool(v: Option<String>) -> Option<bool> {
    v.map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn parse_u64(v: Option<String>) -> Option<u64> {
    v.and_then(|s| s.trim().parse::<u64>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
