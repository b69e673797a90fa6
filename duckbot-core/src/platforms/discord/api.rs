use std::sync::Arc;

use async_trait::async_trait;
use twilight_http::Client as HttpClient;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, RoleMarker, UserMarker};
use twilight_model::id::Id;

use duckbot_common::traits::ChatModerationApi;
use duckbot_common::Error;

/// `ChatModerationApi` over twilight-http. One page of channel history is
/// what the platform hands back per request; the sweep treats that as the
/// channel's recent history.
pub struct DiscordApiClient {
    http: Arc<HttpClient>,
}

impl DiscordApiClient {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChatModerationApi for DiscordApiClient {
    async fn find_role(
        &self,
        guild_id: Id<GuildMarker>,
        name: &str,
    ) -> Result<Option<Id<RoleMarker>>, Error> {
        let roles = self
            .http
            .roles(guild_id)
            .await
            .map_err(|e| Error::Platform(format!("Error listing roles for {guild_id}: {e:?}")))?
            .models()
            .await
            .map_err(|e| Error::Platform(format!("Error parsing roles for {guild_id}: {e:?}")))?;

        Ok(roles.into_iter().find(|r| r.name == name).map(|r| r.id))
    }

    async fn add_role(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        role_id: Id<RoleMarker>,
    ) -> Result<(), Error> {
        self.http
            .add_guild_member_role(guild_id, user_id, role_id)
            .await
            .map_err(|e| Error::Platform(format!("Error adding role {role_id} to {user_id}: {e:?}")))?;
        Ok(())
    }

    async fn remove_role(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        role_id: Id<RoleMarker>,
    ) -> Result<(), Error> {
        self.http
            .remove_guild_member_role(guild_id, user_id, role_id)
            .await
            .map_err(|e| {
                Error::Platform(format!("Error removing role {role_id} from {user_id}: {e:?}"))
            })?;
        Ok(())
    }

    async fn reply(
        &self,
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
        text: &str,
    ) -> Result<(), Error> {
        self.http
            .create_message(channel_id)
            .content(text)
            .reply(message_id)
            .await
            .map_err(|e| Error::Platform(format!("Error sending Discord reply: {e:?}")))?;
        Ok(())
    }

    async fn announce(&self, channel_id: Id<ChannelMarker>, text: &str) -> Result<(), Error> {
        self.http
            .create_message(channel_id)
            .content(text)
            .await
            .map_err(|e| Error::Platform(format!("Error sending Discord message: {e:?}")))?;
        Ok(())
    }

    async fn guild_channels(
        &self,
        guild_id: Id<GuildMarker>,
    ) -> Result<Vec<Id<ChannelMarker>>, Error> {
        let channels = self
            .http
            .guild_channels(guild_id)
            .await
            .map_err(|e| Error::Platform(format!("Error listing channels for {guild_id}: {e:?}")))?
            .models()
            .await
            .map_err(|e| {
                Error::Platform(format!("Error parsing channels for {guild_id}: {e:?}"))
            })?;

        Ok(channels.into_iter().map(|ch| ch.id).collect())
    }

    async fn channel_messages(
        &self,
        channel_id: Id<ChannelMarker>,
    ) -> Result<Vec<(Id<MessageMarker>, Id<UserMarker>)>, Error> {
        let messages = self
            .http
            .channel_messages(channel_id)
            .await
            .map_err(|e| Error::Platform(format!("Error fetching history for {channel_id}: {e:?}")))?
            .models()
            .await
            .map_err(|e| {
                Error::Platform(format!("Error parsing history for {channel_id}: {e:?}"))
            })?;

        Ok(messages
            .into_iter()
            .map(|m| (m.id, m.author.id))
            .collect())
    }

    async fn delete_message(
        &self,
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
    ) -> Result<(), Error> {
        self.http
            .delete_message(channel_id, message_id)
            .await
            .map_err(|e| {
                Error::Platform(format!("Error deleting message {message_id} in {channel_id}: {e:?}"))
            })?;
        Ok(())
    }
}
