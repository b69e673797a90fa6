use chrono::{DateTime, Utc};
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, RoleMarker, UserMarker};
use twilight_model::id::Id;

/// Immutable snapshot of one inbound chat message, as delivered by the
/// platform runtime. The moderation core never goes back to the platform
/// for any of these fields.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub guild_id: Option<Id<GuildMarker>>,
    pub channel_id: Id<ChannelMarker>,
    pub message_id: Id<MessageMarker>,
    pub author_id: Id<UserMarker>,
    pub author_name: String,
    /// Message text; empty string is a valid value (attachment-only posts).
    pub content: String,
    /// Byte size of the first attachment, if any.
    pub attachment_size: Option<u64>,
    /// Guild roles the author held when the message arrived.
    pub author_roles: Vec<Id<RoleMarker>>,
    /// Resolved by the runtime: bot or webhook author.
    pub author_is_bot: bool,
    /// Resolved by the runtime: author owns the guild.
    pub author_is_owner: bool,
    pub timestamp: DateTime<Utc>,
}
