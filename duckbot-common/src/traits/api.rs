use async_trait::async_trait;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, RoleMarker, UserMarker};
use twilight_model::id::Id;

use crate::error::Error;

/// Everything the moderation core asks of the chat platform. Implemented
/// over twilight-http in production and by recording mocks in tests.
///
/// All operations are best-effort from the caller's point of view: role
/// and message mutation may fail transiently, and callers are expected to
/// log and continue rather than abort event processing.
#[async_trait]
pub trait ChatModerationApi: Send + Sync {
    /// Resolves a role by display name. "Role not found" is `Ok(None)`,
    /// never an error.
    async fn find_role(
        &self,
        guild_id: Id<GuildMarker>,
        name: &str,
    ) -> Result<Option<Id<RoleMarker>>, Error>;

    async fn add_role(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        role_id: Id<RoleMarker>,
    ) -> Result<(), Error>;

    async fn remove_role(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        role_id: Id<RoleMarker>,
    ) -> Result<(), Error>;

    /// Posts a reply to a specific message in its channel.
    async fn reply(
        &self,
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
        text: &str,
    ) -> Result<(), Error>;

    /// Posts a plain message into a channel.
    async fn announce(&self, channel_id: Id<ChannelMarker>, text: &str) -> Result<(), Error>;

    /// Lists all channels in a guild.
    async fn guild_channels(
        &self,
        guild_id: Id<GuildMarker>,
    ) -> Result<Vec<Id<ChannelMarker>>, Error>;

    /// One page of recent history for a channel: (message id, author id)
    /// pairs, newest first.
    async fn channel_messages(
        &self,
        channel_id: Id<ChannelMarker>,
    ) -> Result<Vec<(Id<MessageMarker>, Id<UserMarker>)>, Error>;

    async fn delete_message(
        &self,
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
    ) -> Result<(), Error>;
}
