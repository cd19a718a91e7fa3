use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use roster::{DisplayError, DisplaySurface, PostedMessage};
use shared::{
    domain::{ApplicationId, ChannelId, GuildId, MessageId, UserId},
    protocol::{CommandDefinition, Embed, Reply},
};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::model::{
    ApiErrorBody, ApplicationCommand, Channel, Interaction, InteractionResponse, Message,
    MessageBody, User,
};

pub const DEFAULT_API_BASE_URL: &str = "https://discord.com/api/v10";

const UNKNOWN_CHANNEL: u64 = 10003;
const UNKNOWN_MESSAGE: u64 = 10008;
const MISSING_ACCESS: u64 = 50001;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Authenticated client for the bot's REST calls.
#[derive(Clone)]
pub struct DiscordHttp {
    http: Client,
    base_url: String,
    token: String,
    current_user: Arc<OnceCell<UserId>>,
}

impl DiscordHttp {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        ensure_http_base(base_url)?;
        let http = Client::builder()
            .user_agent(concat!(
                "DiscordBot (https://github.com/enterprise-roster, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            current_user: Arc::new(OnceCell::new()),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .header(header::AUTHORIZATION, format!("Bot {}", self.token))
    }

    /// Records the bot identity announced by the gateway so it need not be
    /// fetched over HTTP.
    pub fn remember_current_user(&self, user_id: UserId) {
        let _ = self.current_user.set(user_id);
    }

    pub async fn fetch_current_user(&self) -> Result<User> {
        let user = self
            .request(Method::GET, "/users/@me")
            .send()
            .await?
            .error_for_status()
            .context("failed to fetch current user")?
            .json::<User>()
            .await?;
        Ok(user)
    }

    /// Replaces the guild's command set with `definitions`.
    pub async fn register_guild_commands(
        &self,
        application_id: ApplicationId,
        guild_id: GuildId,
        definitions: &[CommandDefinition],
    ) -> Result<usize> {
        let body: Vec<ApplicationCommand> = definitions.iter().map(Into::into).collect();
        let registered = self
            .request(
                Method::PUT,
                &format!("/applications/{application_id}/guilds/{guild_id}/commands"),
            )
            .json(&body)
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("failed to register commands for guild {guild_id}"))?
            .json::<Vec<serde_json::Value>>()
            .await?;
        info!(guild_id = %guild_id, count = registered.len(), "commands registered");
        Ok(registered.len())
    }

    pub async fn respond_to_interaction(&self, interaction: &Interaction, reply: &Reply) -> Result<()> {
        self.request(
            Method::POST,
            &format!(
                "/interactions/{}/{}/callback",
                interaction.id, interaction.token
            ),
        )
        .json(&InteractionResponse::from(reply))
        .send()
        .await?
        .error_for_status()
        .with_context(|| format!("failed to answer interaction {}", interaction.id))?;
        debug!(interaction_id = %interaction.id, ephemeral = reply.ephemeral, "interaction answered");
        Ok(())
    }
}

/// Maps a response onto the display error taxonomy, passing 2xx through.
async fn classify(response: Response) -> Result<Response, DisplayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .json::<ApiErrorBody>()
        .await
        .unwrap_or_default();
    Err(match (status, body.code) {
        (_, UNKNOWN_CHANNEL) | (_, MISSING_ACCESS) => DisplayError::ChannelUnavailable,
        (_, UNKNOWN_MESSAGE) => DisplayError::MessageMissing,
        (StatusCode::FORBIDDEN, _) => DisplayError::ChannelUnavailable,
        _ => DisplayError::Transport(format!("{status}: {} ({})", body.message, body.code)),
    })
}

fn transport(err: reqwest::Error) -> DisplayError {
    DisplayError::Transport(err.to_string())
}

#[async_trait]
impl DisplaySurface for DiscordHttp {
    async fn current_user(&self) -> Result<UserId, DisplayError> {
        self.current_user
            .get_or_try_init(|| async {
                self.fetch_current_user()
                    .await
                    .map(|user| user.id)
                    .map_err(|e| DisplayError::Transport(format!("{e:#}")))
            })
            .await
            .copied()
    }

    async fn resolve_channel(&self, channel: ChannelId) -> Result<(), DisplayError> {
        let response = self
            .request(Method::GET, &format!("/channels/{channel}"))
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(DisplayError::ChannelUnavailable);
        }
        let resolved = classify(response)
            .await?
            .json::<Channel>()
            .await
            .map_err(transport)?;
        debug!(channel_id = %resolved.id, guild_id = ?resolved.guild_id, "display channel resolved");
        Ok(())
    }

    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: u8,
    ) -> Result<Vec<PostedMessage>, DisplayError> {
        let response = self
            .request(Method::GET, &format!("/channels/{channel}/messages"))
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(transport)?;
        let messages = classify(response)
            .await?
            .json::<Vec<Message>>()
            .await
            .map_err(transport)?;
        Ok(messages
            .into_iter()
            .map(|message| PostedMessage {
                id: message.id,
                author_id: message.author.id,
                has_embed: !message.embeds.is_empty(),
            })
            .collect())
    }

    async fn post_embed(&self, channel: ChannelId, embed: &Embed) -> Result<MessageId, DisplayError> {
        let response = self
            .request(Method::POST, &format!("/channels/{channel}/messages"))
            .json(&MessageBody::embed(embed))
            .send()
            .await
            .map_err(transport)?;
        let message = classify(response)
            .await?
            .json::<Message>()
            .await
            .map_err(transport)?;
        Ok(message.id)
    }

    async fn edit_embed(
        &self,
        channel: ChannelId,
        message: MessageId,
        embed: &Embed,
    ) -> Result<(), DisplayError> {
        let response = self
            .request(
                Method::PATCH,
                &format!("/channels/{channel}/messages/{message}"),
            )
            .json(&MessageBody::embed(embed))
            .send()
            .await
            .map_err(transport)?;
        classify(response).await?;
        Ok(())
    }
}

fn ensure_http_base(base_url: &str) -> Result<()> {
    let parsed = url::Url::parse(base_url).with_context(|| format!("invalid api base url '{base_url}'"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(anyhow!("api base url must be http(s), got '{other}'")),
    }
}

#[cfg(test)]
#[path = "tests/rest_tests.rs"]
mod tests;
