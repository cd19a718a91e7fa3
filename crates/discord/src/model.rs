//! Wire shapes of the Discord HTTP API (v10) and gateway, limited to the
//! fields this bot reads or writes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{
    domain::{ApplicationId, ChannelId, GuildId, InteractionId, MessageId, UserId},
    protocol::{CommandDefinition, CommandInvocation, CommandOption, Embed, Reply},
};

pub const APPLICATION_COMMAND_INTERACTION: u8 = 2;
pub const CHAT_INPUT_COMMAND: u8 = 1;
pub const STRING_OPTION: u8 = 3;
pub const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;
pub const EPHEMERAL_FLAG: u64 = 1 << 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
}

impl User {
    pub fn tag(&self) -> String {
        match self.discriminator.as_deref() {
            Some(d) if d != "0" => format!("{}#{d}", self.username),
            _ => self.username.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author: User,
    #[serde(default)]
    pub embeds: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<GuildId>,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: u64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hello {
    pub heartbeat_interval: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartialApplication {
    pub id: ApplicationId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ready {
    pub user: User,
    pub application: PartialApplication,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionDataOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<InteractionDataOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub application_id: ApplicationId,
    #[serde(rename = "type")]
    pub kind: u8,
    pub token: String,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    #[serde(default)]
    pub member: Option<Member>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub data: Option<InteractionData>,
}

impl Interaction {
    pub fn invoker(&self) -> Option<&User> {
        self.member
            .as_ref()
            .and_then(|member| member.user.as_ref())
            .or(self.user.as_ref())
    }

    /// The slash command carried by this interaction, if it is one.
    pub fn invocation(&self) -> Option<CommandInvocation> {
        if self.kind != APPLICATION_COMMAND_INTERACTION {
            return None;
        }
        let data = self.data.as_ref()?;
        let options = data
            .options
            .iter()
            .filter_map(|option| {
                let value = match option.value.as_ref()? {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                Some(CommandOption {
                    name: option.name.clone(),
                    value,
                })
            })
            .collect();
        Some(CommandInvocation {
            name: data.name.clone(),
            options,
            invoked_by: self.invoker().map(|user| user.id),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationCommandOption {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: String,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationCommand {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: String,
    pub description: String,
    pub options: Vec<ApplicationCommandOption>,
}

impl From<&CommandDefinition> for ApplicationCommand {
    fn from(value: &CommandDefinition) -> Self {
        Self {
            kind: CHAT_INPUT_COMMAND,
            name: value.name.clone(),
            description: value.description.clone(),
            options: value
                .options
                .iter()
                .map(|option| ApplicationCommandOption {
                    kind: STRING_OPTION,
                    name: option.name.clone(),
                    description: option.description.clone(),
                    required: option.required,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AllowedMentions {
    pub parse: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionCallbackData {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
    pub allowed_mentions: AllowedMentions,
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    pub data: InteractionCallbackData,
}

impl From<&Reply> for InteractionResponse {
    fn from(reply: &Reply) -> Self {
        Self {
            kind: CHANNEL_MESSAGE_WITH_SOURCE,
            data: InteractionCallbackData {
                content: reply.content.clone(),
                flags: reply.ephemeral.then_some(EPHEMERAL_FLAG),
                allowed_mentions: AllowedMentions::default(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageBody<'a> {
    pub embeds: [&'a Embed; 1],
}

impl<'a> MessageBody<'a> {
    pub fn embed(embed: &'a Embed) -> Self {
        Self { embeds: [embed] }
    }
}
