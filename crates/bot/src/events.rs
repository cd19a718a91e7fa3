use anyhow::{Context, Result};
use discord::{DiscordHttp, GatewayEvent, Interaction, Ready};
use roster::{command_definitions, handle_command, synchronize, RosterContext, SyncOutcome};
use shared::domain::GuildId;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Reacts to gateway events, one at a time.
#[derive(Clone)]
pub struct Bot {
    pub roster: RosterContext,
    pub http: DiscordHttp,
    pub guild_id: GuildId,
}

impl Bot {
    /// Drains `events` until the gateway side hangs up. A failing event is
    /// logged and does not stop the loop.
    pub async fn run(&self, mut events: mpsc::Receiver<GatewayEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(err) = self.handle_event(event).await {
                error!(error = %format!("{err:#}"), "event handling failed");
            }
        }
        info!("gateway event stream closed");
    }

    pub async fn handle_event(&self, event: GatewayEvent) -> Result<()> {
        match event {
            GatewayEvent::Ready(ready) => self.on_ready(ready).await,
            GatewayEvent::InteractionCreate(interaction) => self.on_interaction(interaction).await,
        }
    }

    async fn on_ready(&self, ready: Ready) -> Result<()> {
        self.http.remember_current_user(ready.user.id);
        info!(user = %ready.user.tag(), "connected to discord");

        self.http
            .register_guild_commands(ready.application.id, self.guild_id, &command_definitions())
            .await
            .context("command registration failed")?;

        match synchronize(&self.roster).await {
            Ok(SyncOutcome::Skipped) => {}
            Ok(outcome) => info!(?outcome, "startup roster synchronization"),
            Err(err) => error!(error = %err, "startup roster synchronization failed"),
        }
        Ok(())
    }

    async fn on_interaction(&self, interaction: Interaction) -> Result<()> {
        let Some(invocation) = interaction.invocation() else {
            debug!(kind = interaction.kind, "ignoring non-command interaction");
            return Ok(());
        };
        let reply = handle_command(&self.roster, &invocation).await;
        self.http
            .respond_to_interaction(&interaction, &reply)
            .await
            .with_context(|| format!("failed to reply to /{}", invocation.name))
    }
}

#[cfg(test)]
#[path = "tests/events_tests.rs"]
mod tests;
