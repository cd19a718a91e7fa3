use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

/// Platform identifiers travel as decimal strings on the wire but are 64-bit
/// unsigned integers everywhere else.
macro_rules! snowflake_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map($name)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(SnowflakeVisitor).map($name)
            }
        }
    };
}

struct SnowflakeVisitor;

impl de::Visitor<'_> for SnowflakeVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a snowflake as a decimal string or unsigned integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
        v.parse::<u64>().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
        u64::try_from(v).map_err(E::custom)
    }
}

id_newtype!(EnterpriseId);

snowflake_newtype!(UserId);
snowflake_newtype!(GuildId);
snowflake_newtype!(ChannelId);
snowflake_newtype!(MessageId);
snowflake_newtype!(ApplicationId);
snowflake_newtype!(InteractionId);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid enterprise type '{0}' (expected legal or illegal)")]
    InvalidKind(String),
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnterpriseKind {
    Legal,
    Illegal,
}

impl EnterpriseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EnterpriseKind::Legal => "legal",
            EnterpriseKind::Illegal => "illegal",
        }
    }
}

impl fmt::Display for EnterpriseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnterpriseKind {
    type Err = ValidationError;

    /// Matching is exact: `Legal` or ` legal` are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legal" => Ok(EnterpriseKind::Legal),
            "illegal" => Ok(EnterpriseKind::Illegal),
            other => Err(ValidationError::InvalidKind(other.to_string())),
        }
    }
}

/// A stored enterprise. `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enterprise {
    pub id: EnterpriseId,
    pub name: String,
    pub manager: String,
    pub discord_link: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: EnterpriseKind,
    /// Milliseconds since the unix epoch.
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEnterprise {
    pub name: String,
    pub manager: String,
    pub kind: EnterpriseKind,
    pub description: String,
    pub discord_link: String,
}

impl NewEnterprise {
    pub fn new(name: impl Into<String>, manager: impl Into<String>, kind: EnterpriseKind) -> Self {
        Self {
            name: name.into(),
            manager: manager.into(),
            kind,
            description: String::new(),
            discord_link: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_discord_link(mut self, discord_link: impl Into<String>) -> Self {
        self.discord_link = discord_link.into();
        self
    }

    /// Builds a record from raw command input, trimming the text fields and
    /// rejecting an empty name or manager and any type other than
    /// `legal`/`illegal`.
    pub fn parse(
        name: &str,
        manager: &str,
        kind: &str,
        description: Option<&str>,
        discord_link: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let kind = kind.parse::<EnterpriseKind>()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        let manager = manager.trim();
        if manager.is_empty() {
            return Err(ValidationError::EmptyField("manager"));
        }

        Ok(Self::new(name, manager, kind)
            .with_description(description.map(str::trim).unwrap_or_default())
            .with_discord_link(discord_link.map(str::trim).unwrap_or_default()))
    }
}
