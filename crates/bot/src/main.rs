use std::sync::Arc;

use discord::{DiscordHttp, GatewayClient, GUILDS_INTENT};
use roster::RosterContext;
use storage::Storage;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod events;

use config::{load_settings, prepare_database_url};
use events::Bot;

const EVENT_BUFFER: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings().map_err(|err| {
        error!(%err, "startup configuration invalid");
        err
    })?;
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let http = DiscordHttp::new(&settings.api_base_url, &settings.discord_token)?;
    let bot = Bot {
        roster: RosterContext {
            storage,
            display: Arc::new(http.clone()),
            display_channel: settings.channel_id,
        },
        http,
        guild_id: settings.guild_id,
    };

    let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
    let gateway = GatewayClient::new(&settings.gateway_url, &settings.discord_token, GUILDS_INTENT);
    let gateway_task = tokio::spawn(gateway.run(events_tx));
    info!(guild_id = %settings.guild_id, channel_id = %settings.channel_id, "bot starting");

    // The event stream only closes once the gateway task has returned.
    tokio::select! {
        _ = bot.run(events_rx) => {
            gateway_task.await??;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }
    Ok(())
}
