use chrono::Utc;
use shared::{
    domain::{ChannelId, MessageId},
    protocol::Embed,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{view::render_roster, DisplayError, RosterContext};

/// How many of the channel's latest messages are searched for a roster
/// message posted before its id was persisted. Only the bot's own messages
/// carrying an embed qualify.
pub const RECENT_WINDOW: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Created(MessageId),
    Updated(MessageId),
    Skipped,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("storage unavailable: {0:#}")]
    Storage(anyhow::Error),
    #[error(transparent)]
    Display(#[from] DisplayError),
}

/// Renders the current roster and writes it into the single roster message
/// of the display channel, creating that message when none exists yet.
///
/// An unreachable display channel is not an error: the outcome is
/// [`SyncOutcome::Skipped`].
pub async fn synchronize(ctx: &RosterContext) -> Result<SyncOutcome, SyncError> {
    let channel = ctx.display_channel;
    match publish(ctx, channel).await {
        Err(SyncError::Display(DisplayError::ChannelUnavailable)) => {
            warn!(channel_id = %channel, "display channel unavailable; roster not synchronized");
            Ok(SyncOutcome::Skipped)
        }
        other => other,
    }
}

async fn publish(ctx: &RosterContext, channel: ChannelId) -> Result<SyncOutcome, SyncError> {
    ctx.display.resolve_channel(channel).await?;

    let enterprises = ctx
        .storage
        .list_enterprises()
        .await
        .map_err(SyncError::Storage)?;
    let embed = render_roster(&enterprises, Utc::now());

    let stored = ctx
        .storage
        .load_display_artifact(channel)
        .await
        .map_err(SyncError::Storage)?;
    if let Some(message_id) = stored {
        match ctx.display.edit_embed(channel, message_id, &embed).await {
            Ok(()) => {
                debug!(channel_id = %channel, message_id = %message_id, "roster message updated");
                return Ok(SyncOutcome::Updated(message_id));
            }
            Err(DisplayError::MessageMissing) => {
                info!(
                    channel_id = %channel,
                    message_id = %message_id,
                    "stored roster message is gone; looking for a replacement"
                );
                ctx.storage
                    .clear_display_artifact(channel)
                    .await
                    .map_err(SyncError::Storage)?;
            }
            Err(err) => return Err(err.into()),
        }
    }

    if let Some(message_id) = find_own_recent_message(ctx, channel).await? {
        ctx.display.edit_embed(channel, message_id, &embed).await?;
        remember(ctx, channel, message_id).await?;
        info!(channel_id = %channel, message_id = %message_id, "adopted existing roster message");
        return Ok(SyncOutcome::Updated(message_id));
    }

    let message_id = post(ctx, channel, &embed).await?;
    info!(channel_id = %channel, message_id = %message_id, "roster message created");
    Ok(SyncOutcome::Created(message_id))
}

async fn find_own_recent_message(
    ctx: &RosterContext,
    channel: ChannelId,
) -> Result<Option<MessageId>, SyncError> {
    let me = ctx.display.current_user().await?;
    let recent = ctx.display.recent_messages(channel, RECENT_WINDOW).await?;
    Ok(recent
        .into_iter()
        .take(usize::from(RECENT_WINDOW))
        .find(|message| message.author_id == me && message.has_embed)
        .map(|message| message.id))
}

async fn post(ctx: &RosterContext, channel: ChannelId, embed: &Embed) -> Result<MessageId, SyncError> {
    let message_id = ctx.display.post_embed(channel, embed).await?;
    remember(ctx, channel, message_id).await?;
    Ok(message_id)
}

async fn remember(
    ctx: &RosterContext,
    channel: ChannelId,
    message_id: MessageId,
) -> Result<(), SyncError> {
    ctx.storage
        .save_display_artifact(channel, message_id)
        .await
        .map_err(SyncError::Storage)
}

#[cfg(test)]
#[path = "tests/sync_tests.rs"]
mod tests;
