use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, error, info, trace, warn};
use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};
use twilight_model::id::Id;

use duckbot_common::models::MessageEvent;
use duckbot_common::traits::ChatModerationApi;

use crate::services::spam_watchdog::{
    SpamVerdict, SpamWatchdog, SANCTION_REPEAT_COUNT, WARN_REPEAT_COUNT,
};
use crate::services::tier_service::{RoleDirectory, TierService};
use crate::Error;

const WARNING_TEXT: &str = "Sssh...";
const SANCTION_TEXT: &str =
    "was a very, very bad duckling and *accidentally* has drown in the lake.";

/// What the dispatcher did with one event. Returned for observability and
/// tests; callers in the event loop ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Dropped at the filter stage; no state was touched.
    Filtered,
    /// Counted toward the user's tier total (possibly with a promotion).
    Counted,
    /// Counted, and the user was warned for repetition.
    Warned,
    /// The user was sanctioned; tier total untouched.
    Sanctioned,
}

/// Ties the spam watchdog and the tier service together: filters each
/// inbound event, classifies it, and issues the side effects the verdict
/// calls for. Owns all per-user moderation state.
pub struct ModerationService {
    watchdog: SpamWatchdog,
    tiers: TierService,
    directory: Arc<RoleDirectory>,
    api: Arc<dyn ChatModerationApi>,
    /// Serializes processing per user; events for different users run
    /// concurrently, events for one user in arrival order.
    user_locks: DashMap<Id<UserMarker>, Arc<Mutex<()>>>,
}

impl ModerationService {
    pub fn new(api: Arc<dyn ChatModerationApi>) -> Self {
        let directory = Arc::new(RoleDirectory::new(api.clone()));
        Self {
            watchdog: SpamWatchdog::new(),
            tiers: TierService::new(api.clone(), directory.clone()),
            directory,
            api,
            user_locks: DashMap::new(),
        }
    }

    pub fn watchdog(&self) -> &SpamWatchdog {
        &self.watchdog
    }

    pub fn tiers(&self) -> &TierService {
        &self.tiers
    }

    /// Processes one inbound message event end to end. Never returns an
    /// error for platform failures; those are logged where they happen so
    /// the event loop stays alive.
    pub async fn process(&self, event: &MessageEvent) -> Result<Outcome, Error> {
        trace!(".");

        // Filter stage: moderation only applies to ordinary guild members.
        if event.author_is_bot {
            debug!("Ignoring bot/webhook message from {}", event.author_name);
            return Ok(Outcome::Filtered);
        }
        let Some(guild_id) = event.guild_id else {
            return Ok(Outcome::Filtered);
        };
        if event.author_is_owner {
            return Ok(Outcome::Filtered);
        }
        if let Some(sanction_role) = self.directory.sanction_role(guild_id).await? {
            // Terminal state: sanctioned users are never processed again.
            if event.author_roles.contains(&sanction_role) {
                return Ok(Outcome::Filtered);
            }
        }

        let lock = self.lock_for(event.author_id);
        let _guard = lock.lock().await;

        let verdict = self
            .watchdog
            .observe(event.author_id, &event.content, event.attachment_size);

        match verdict {
            SpamVerdict::Repeated(SANCTION_REPEAT_COUNT) => {
                self.sanction(guild_id, event).await;
                Ok(Outcome::Sanctioned)
            }
            SpamVerdict::Repeated(WARN_REPEAT_COUNT) => {
                if let Err(e) = self
                    .api
                    .reply(event.channel_id, event.message_id, WARNING_TEXT)
                    .await
                {
                    warn!("Failed to send repeat warning: {e:?}");
                }
                // The warned message still counts toward the tier total.
                self.tiers
                    .advance(guild_id, event.author_id, &event.author_roles)
                    .await?;
                Ok(Outcome::Warned)
            }
            SpamVerdict::Fresh | SpamVerdict::Repeated(_) => {
                self.tiers
                    .advance(guild_id, event.author_id, &event.author_roles)
                    .await?;
                Ok(Outcome::Counted)
            }
        }
    }

    fn lock_for(&self, user_id: Id<UserMarker>) -> Arc<Mutex<()>> {
        self.user_locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// The sanction sub-flow: announce, grant the sanction role, stop
    /// tracking the user, then sweep their messages out of every channel.
    /// Everything here is best-effort.
    async fn sanction(&self, guild_id: Id<GuildMarker>, event: &MessageEvent) {
        debug!("!");

        let sanction_role = match self.directory.sanction_role(guild_id).await {
            Ok(Some(role_id)) => role_id,
            Ok(None) => return,
            Err(e) => {
                error!("Sanction role lookup failed for guild {guild_id}: {e:?}");
                return;
            }
        };

        if let Err(e) = self
            .api
            .announce(
                event.channel_id,
                &format!("{} {SANCTION_TEXT}", event.author_name),
            )
            .await
        {
            warn!("Failed to announce sanction: {e:?}");
        }

        if let Err(e) = self
            .api
            .add_role(guild_id, event.author_id, sanction_role)
            .await
        {
            error!("Failed to grant sanction role to {}: {e:?}", event.author_id);
            return;
        }

        self.watchdog.forget(event.author_id);
        info!(
            "User {} ({}) sanctioned in guild {guild_id}; sweeping their messages",
            event.author_name, event.author_id
        );

        self.sweep_user_messages(guild_id, event.author_id).await;
    }

    /// Deletes every message by `user_id` found in each channel's recent
    /// history, fanning out across channels and messages. Partial failures
    /// are logged and skipped; the sweep never aborts early.
    async fn sweep_user_messages(&self, guild_id: Id<GuildMarker>, user_id: Id<UserMarker>) {
        let channels = match self.api.guild_channels(guild_id).await {
            Ok(channels) => channels,
            Err(e) => {
                error!("Failed to list channels for guild {guild_id}: {e:?}");
                return;
            }
        };

        let sweeps = channels
            .into_iter()
            .map(|channel_id| self.sweep_channel(channel_id, user_id));
        join_all(sweeps).await;
    }

    async fn sweep_channel(&self, channel_id: Id<ChannelMarker>, user_id: Id<UserMarker>) {
        let messages = match self.api.channel_messages(channel_id).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Failed to fetch history for channel {channel_id}: {e:?}");
                return;
            }
        };

        let deletions = messages
            .into_iter()
            .filter(|(_, author_id)| *author_id == user_id)
            .map(|(message_id, _)| async move {
                if let Err(e) = self.api.delete_message(channel_id, message_id).await {
                    warn!("Failed to delete message {message_id} in {channel_id}: {e:?}");
                }
            });
        join_all(deletions).await;
    }
}
