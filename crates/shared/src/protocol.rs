use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{domain::UserId, error::CommandError};

/// Rich message body. Field names follow the platform's embed object so the
/// struct can be sent as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub color: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// Answer to a command invocation. Ephemeral replies are only visible to the
/// member who invoked the command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub content: String,
    pub ephemeral: bool,
}

impl Reply {
    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

impl From<CommandError> for Reply {
    fn from(value: CommandError) -> Self {
        Reply::ephemeral(value.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub options: Vec<CommandOptionDefinition>,
}

/// All options are free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOptionDefinition {
    pub name: String,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOption {
    pub name: String,
    pub value: String,
}

/// A slash command as delivered by the command dispatcher, reduced to what the
/// handlers need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInvocation {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoked_by: Option<UserId>,
}

impl CommandInvocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Vec::new(),
            invoked_by: None,
        }
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(CommandOption {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Value of the named option, `None` when absent or blank.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|option| option.name == name)
            .map(|option| option.value.as_str())
            .filter(|value| !value.trim().is_empty())
    }
}
