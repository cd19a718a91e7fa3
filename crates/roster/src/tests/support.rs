use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shared::{
    domain::{ChannelId, MessageId, UserId},
    protocol::Embed,
};
use storage::Storage;

use crate::{DisplayError, DisplaySurface, PostedMessage, RosterContext};

pub(crate) const DISPLAY_CHANNEL: ChannelId = ChannelId(500);
pub(crate) const BOT_USER: UserId = UserId(1);

#[derive(Debug, Clone)]
pub(crate) struct ChannelMessage {
    pub id: MessageId,
    pub author_id: UserId,
    pub embed: Option<Embed>,
}

#[derive(Default)]
struct SurfaceState {
    /// Oldest first.
    messages: Vec<ChannelMessage>,
    channel_missing: bool,
    transport_down: bool,
    next_id: u64,
    posts: usize,
    edits: usize,
}

/// One display channel held in memory.
#[derive(Default)]
pub(crate) struct FakeSurface {
    state: Mutex<SurfaceState>,
}

impl FakeSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_channel_missing(&self, missing: bool) {
        self.state.lock().expect("state").channel_missing = missing;
    }

    pub fn set_transport_down(&self, down: bool) {
        self.state.lock().expect("state").transport_down = down;
    }

    pub fn push_message(&self, author_id: UserId) -> MessageId {
        let mut state = self.state.lock().expect("state");
        let id = next_id(&mut state);
        state.messages.push(ChannelMessage {
            id,
            author_id,
            embed: None,
        });
        id
    }

    /// A roster embed left over from an earlier run.
    pub fn push_roster_message(&self, author_id: UserId) -> MessageId {
        let mut state = self.state.lock().expect("state");
        let id = next_id(&mut state);
        state.messages.push(ChannelMessage {
            id,
            author_id,
            embed: Some(crate::view::render_roster(&[], chrono::Utc::now())),
        });
        id
    }

    pub fn delete_message(&self, id: MessageId) {
        self.state
            .lock()
            .expect("state")
            .messages
            .retain(|message| message.id != id);
    }

    pub fn messages(&self) -> Vec<ChannelMessage> {
        self.state.lock().expect("state").messages.clone()
    }

    pub fn own_messages(&self) -> Vec<ChannelMessage> {
        self.messages()
            .into_iter()
            .filter(|message| message.author_id == BOT_USER)
            .collect()
    }

    pub fn posts(&self) -> usize {
        self.state.lock().expect("state").posts
    }

    pub fn edits(&self) -> usize {
        self.state.lock().expect("state").edits
    }

    fn check(&self, channel: ChannelId) -> Result<(), DisplayError> {
        let state = self.state.lock().expect("state");
        if state.transport_down {
            return Err(DisplayError::Transport("connection reset".into()));
        }
        if state.channel_missing || channel != DISPLAY_CHANNEL {
            return Err(DisplayError::ChannelUnavailable);
        }
        Ok(())
    }
}

fn next_id(state: &mut SurfaceState) -> MessageId {
    state.next_id += 1;
    MessageId(1000 + state.next_id)
}

#[async_trait]
impl DisplaySurface for FakeSurface {
    async fn current_user(&self) -> Result<UserId, DisplayError> {
        Ok(BOT_USER)
    }

    async fn resolve_channel(&self, channel: ChannelId) -> Result<(), DisplayError> {
        self.check(channel)
    }

    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: u8,
    ) -> Result<Vec<PostedMessage>, DisplayError> {
        self.check(channel)?;
        let state = self.state.lock().expect("state");
        Ok(state
            .messages
            .iter()
            .rev()
            .take(usize::from(limit))
            .map(|message| PostedMessage {
                id: message.id,
                author_id: message.author_id,
                has_embed: message.embed.is_some(),
            })
            .collect())
    }

    async fn post_embed(&self, channel: ChannelId, embed: &Embed) -> Result<MessageId, DisplayError> {
        self.check(channel)?;
        let mut state = self.state.lock().expect("state");
        let id = next_id(&mut state);
        state.messages.push(ChannelMessage {
            id,
            author_id: BOT_USER,
            embed: Some(embed.clone()),
        });
        state.posts += 1;
        Ok(id)
    }

    async fn edit_embed(
        &self,
        channel: ChannelId,
        message: MessageId,
        embed: &Embed,
    ) -> Result<(), DisplayError> {
        self.check(channel)?;
        let mut state = self.state.lock().expect("state");
        let target = state
            .messages
            .iter_mut()
            .find(|m| m.id == message)
            .ok_or(DisplayError::MessageMissing)?;
        target.embed = Some(embed.clone());
        state.edits += 1;
        Ok(())
    }
}

pub(crate) async fn context(surface: Arc<FakeSurface>) -> RosterContext {
    RosterContext {
        storage: Storage::new("sqlite::memory:").await.expect("db"),
        display: surface,
        display_channel: DISPLAY_CHANNEL,
    }
}
