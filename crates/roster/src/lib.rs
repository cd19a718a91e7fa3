//! Enterprise roster: slash-command handlers, the rendered roster embed and
//! the synchronizer that keeps the single roster message in the display
//! channel up to date.

use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{ChannelId, MessageId, UserId},
    protocol::Embed,
};
use storage::Storage;
use thiserror::Error;

pub mod commands;
pub mod sync;
pub mod view;

pub use commands::{command_definitions, handle_command};
pub use sync::{synchronize, SyncError, SyncOutcome};

/// Everything a command handler needs, built once at startup.
#[derive(Clone)]
pub struct RosterContext {
    pub storage: Storage,
    pub display: Arc<dyn DisplaySurface>,
    pub display_channel: ChannelId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub id: MessageId,
    pub author_id: UserId,
    /// Command replies carry none; roster messages carry one.
    pub has_embed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayError {
    #[error("display channel is unavailable")]
    ChannelUnavailable,
    #[error("message no longer exists")]
    MessageMissing,
    #[error("display transport failed: {0}")]
    Transport(String),
}

/// The chat platform as seen by the synchronizer.
#[async_trait]
pub trait DisplaySurface: Send + Sync {
    /// Identity the surface posts as.
    async fn current_user(&self) -> Result<UserId, DisplayError>;

    async fn resolve_channel(&self, channel: ChannelId) -> Result<(), DisplayError>;

    /// Up to `limit` messages, most recent first.
    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: u8,
    ) -> Result<Vec<PostedMessage>, DisplayError>;

    async fn post_embed(&self, channel: ChannelId, embed: &Embed) -> Result<MessageId, DisplayError>;

    async fn edit_embed(
        &self,
        channel: ChannelId,
        message: MessageId,
        embed: &Embed,
    ) -> Result<(), DisplayError>;
}

/// Surface for running without a chat connection (offline tooling): every
/// channel reads as unavailable, so synchronization is skipped.
pub struct DetachedSurface;

#[async_trait]
impl DisplaySurface for DetachedSurface {
    async fn current_user(&self) -> Result<UserId, DisplayError> {
        Err(DisplayError::ChannelUnavailable)
    }

    async fn resolve_channel(&self, _channel: ChannelId) -> Result<(), DisplayError> {
        Err(DisplayError::ChannelUnavailable)
    }

    async fn recent_messages(
        &self,
        _channel: ChannelId,
        _limit: u8,
    ) -> Result<Vec<PostedMessage>, DisplayError> {
        Err(DisplayError::ChannelUnavailable)
    }

    async fn post_embed(
        &self,
        _channel: ChannelId,
        _embed: &Embed,
    ) -> Result<MessageId, DisplayError> {
        Err(DisplayError::ChannelUnavailable)
    }

    async fn edit_embed(
        &self,
        _channel: ChannelId,
        _message: MessageId,
        _embed: &Embed,
    ) -> Result<(), DisplayError> {
        Err(DisplayError::ChannelUnavailable)
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
