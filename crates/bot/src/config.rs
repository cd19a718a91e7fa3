use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use discord::{DEFAULT_API_BASE_URL, DEFAULT_GATEWAY_URL};
use shared::domain::{ChannelId, GuildId};
use thiserror::Error;

pub const SETTINGS_FILE: &str = "bot.toml";
pub const ENV_FILE: &str = ".env";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./data.sqlite";

const ENV_PREFIX: &str = "APP__";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub discord_token: String,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub database_url: String,
    pub api_base_url: String,
    pub gateway_url: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("failed to read {SETTINGS_FILE}: {0}")]
    File(String),
    #[error("failed to read {ENV_FILE}: {0}")]
    EnvFile(String),
}

/// Reads `bot.toml` and `.env` from the working directory (both optional) and
/// the process environment. Process variables shadow `.env` entries.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let file = read_settings_file(Path::new(SETTINGS_FILE))?;
    let dotenv = read_env_file(Path::new(ENV_FILE))?;
    load_settings_from(&file, with_dotenv(|key| std::env::var(key).ok(), dotenv))
}

/// Environment lookup that falls back to `.env` entries.
pub fn with_dotenv(
    process: impl Fn(&str) -> Option<String>,
    dotenv: HashMap<String, String>,
) -> impl Fn(&str) -> Option<String> {
    move |key| process(key).or_else(|| dotenv.get(key).cloned())
}

/// A missing file reads as empty; any other read failure is an error.
pub fn read_settings_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(raw) => parse_settings_file(&raw),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(err) => Err(ConfigError::File(err.to_string())),
    }
}

/// `KEY=value` pairs of a dotenv file, without touching the process
/// environment. A missing file reads as empty.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(err) if err.not_found() => return Ok(HashMap::new()),
        Err(err) => return Err(ConfigError::EnvFile(err.to_string())),
    };
    entries
        .map(|entry| entry.map_err(|err| ConfigError::EnvFile(err.to_string())))
        .collect()
}

pub fn parse_settings_file(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    toml::from_str::<HashMap<String, String>>(raw).map_err(|err| ConfigError::File(err.to_string()))
}

/// Later sources win: file keys, then `KEY`, then `APP__KEY`.
pub fn load_settings_from(
    file: &HashMap<String, String>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings, ConfigError> {
    let lookup = |key: &'static str| -> Option<String> {
        env(&format!("{ENV_PREFIX}{key}"))
            .or_else(|| env(key))
            .or_else(|| file.get(&key.to_ascii_lowercase()).cloned())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let discord_token = lookup("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;
    let guild_id = parse_snowflake::<GuildId>("GUILD_ID", lookup("GUILD_ID"))?;
    let channel_id =
        parse_snowflake::<ChannelId>("ENTERPRISES_CHANNEL_ID", lookup("ENTERPRISES_CHANNEL_ID"))?;

    let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
    let api_base_url = lookup("DISCORD_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.into());
    ensure_scheme("DISCORD_API_BASE_URL", &api_base_url, &["http", "https"])?;
    let gateway_url = lookup("DISCORD_GATEWAY_URL").unwrap_or_else(|| DEFAULT_GATEWAY_URL.into());
    ensure_scheme("DISCORD_GATEWAY_URL", &gateway_url, &["ws", "wss"])?;

    Ok(Settings {
        discord_token,
        guild_id,
        channel_id,
        database_url,
        api_base_url,
        gateway_url,
    })
}

fn parse_snowflake<T: FromStr>(key: &'static str, raw: Option<String>) -> Result<T, ConfigError> {
    let raw = raw.ok_or(ConfigError::Missing(key))?;
    raw.parse::<T>().map_err(|_| ConfigError::Invalid {
        key,
        reason: format!("'{raw}' is not a snowflake id"),
    })
}

fn ensure_scheme(key: &'static str, raw: &str, schemes: &[&str]) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|err| ConfigError::Invalid {
        key,
        reason: err.to_string(),
    })?;
    if schemes.contains(&parsed.scheme()) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            key,
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        })
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return DEFAULT_DATABASE_URL.into();
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(parent) = sqlite_file(database_url).and_then(|path| path.parent().map(Path::to_path_buf))
    else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(&parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })
}

fn sqlite_file(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") {
        return None;
    }
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?
        .split('?')
        .next()
        .unwrap_or_default();
    (!path.is_empty()).then(|| PathBuf::from(path))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
