use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, trace, warn};

use twilight_cache_inmemory::{InMemoryCache, ResourceType};
use twilight_gateway::{
    self as gateway,
    CloseFrame,
    Config,
    Event,
    EventTypeFlags,
    Intents,
    Shard,
    MessageSender,
    StreamExt,
};
use twilight_http::client::ClientBuilder;
use twilight_http::Client as HttpClient;
use twilight_model::gateway::payload::incoming::{MessageCreate, Ready as ReadyPayload};
use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};
use twilight_model::id::Id;

use duckbot_common::models::MessageEvent;
use duckbot_common::traits::platform_traits::{ConnectionStatus, PlatformIntegration};

/// Resolves the guild owner, preferring the in-memory cache and falling
/// back to one HTTP fetch. `None` when both paths fail; the event is then
/// treated as malformed and filtered downstream.
async fn resolve_guild_owner(
    guild_id: Id<GuildMarker>,
    http: &HttpClient,
    cache: &InMemoryCache,
) -> Option<Id<UserMarker>> {
    if let Some(guild) = cache.guild(guild_id) {
        return Some(guild.owner_id());
    }
    match http.guild(guild_id).await {
        Ok(resp) => match resp.model().await {
            Ok(guild) => Some(guild.owner_id),
            Err(e) => {
                error!("Error parsing guild {guild_id} => {e:?}");
                None
            }
        },
        Err(e) => {
            error!("Error fetching guild {guild_id} => {e:?}");
            None
        }
    }
}

/// The shard runner:
///   - calls `shard.next_event(...)`
///   - updates the in-memory cache
///   - translates inbound `MessageCreate` payloads into `MessageEvent`
///     snapshots on `tx`, with the owner/bot flags already resolved so the
///     moderation core never calls back into the platform from its filter.
async fn shard_runner(
    mut shard: Shard,
    tx: UnboundedSender<MessageEvent>,
    http: Arc<HttpClient>,
    cache: Arc<InMemoryCache>,
) {
    let shard_id = shard.id().number();
    let mut current_user: Option<Id<UserMarker>> = None;
    info!("(ShardRunner) Shard {shard_id} started. Listening for events.");

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        match item {
            Ok(event) => {
                cache.update(&event);

                match &event {
                    Event::Ready(ready) => {
                        let data: &ReadyPayload = ready.as_ref();
                        current_user = Some(data.user.id);
                        info!(
                            "Shard {shard_id} => READY as {} (ID={})",
                            data.user.name, data.user.id
                        );
                    }
                    Event::MessageCreate(msg_create) => {
                        let msg: &MessageCreate = msg_create;

                        let author_is_owner = match msg.guild_id {
                            Some(guild_id) => {
                                match resolve_guild_owner(guild_id, &http, &cache).await {
                                    Some(owner_id) => owner_id == msg.author.id,
                                    None => {
                                        // Owner unresolvable: skip rather than
                                        // moderate the owner by accident.
                                        warn!(
                                            "Dropping message {}: owner of guild {guild_id} unresolved",
                                            msg.id
                                        );
                                        continue;
                                    }
                                }
                            }
                            None => false,
                        };

                        let author_is_bot = msg.author.bot
                            || msg.webhook_id.is_some()
                            || current_user == Some(msg.author.id);

                        let author_roles = msg
                            .member
                            .as_ref()
                            .map(|m| m.roles.clone())
                            .unwrap_or_default();

                        let _ = tx.send(MessageEvent {
                            guild_id: msg.guild_id,
                            channel_id: msg.channel_id,
                            message_id: msg.id,
                            author_id: msg.author.id,
                            author_name: msg.author.name.clone(),
                            content: msg.content.clone(),
                            attachment_size: msg.attachments.first().map(|a| a.size),
                            author_roles,
                            author_is_bot,
                            author_is_owner,
                            timestamp: Utc::now(),
                        });
                    }
                    _ => {
                        trace!("Shard {shard_id} => unhandled event: {event:?}");
                    }
                }
            }
            Err(err) => {
                error!("Shard {shard_id} => error receiving event: {err:?}");
            }
        }
    }

    warn!("(ShardRunner) Shard {shard_id} event loop ended.");
}

/// Discord gateway connection. Shards feed `MessageEvent`s into an
/// unbounded channel; the consumer drains it with `next_message_event`.
pub struct DiscordPlatform {
    pub token: String,
    pub connection_status: ConnectionStatus,

    rx: Mutex<Option<UnboundedReceiver<MessageEvent>>>,

    shard_tasks: Vec<JoinHandle<()>>,
    shard_senders: Vec<MessageSender>,

    pub http: Option<Arc<HttpClient>>,
    pub cache: Option<Arc<InMemoryCache>>,
}

impl DiscordPlatform {
    pub fn new(token: String) -> Self {
        Self {
            token,
            connection_status: ConnectionStatus::Disconnected,
            rx: Mutex::new(None),
            shard_tasks: Vec::new(),
            shard_senders: Vec::new(),
            http: None,
            cache: None,
        }
    }

    /// Awaits the next inbound message event, or `None` once disconnected.
    pub async fn next_message_event(&self) -> Option<MessageEvent> {
        let mut guard = self.rx.lock().await;
        match guard.as_mut() {
            Some(r) => r.recv().await,
            None => None,
        }
    }
}

#[async_trait]
impl PlatformIntegration for DiscordPlatform {
    async fn connect(&mut self) -> Result<(), duckbot_common::Error> {
        if self.token.is_empty() {
            return Err(duckbot_common::Error::Platform(
                "Discord token is empty".into(),
            ));
        }
        if matches!(self.connection_status, ConnectionStatus::Connected) {
            info!("(DiscordPlatform) Already connected => skipping");
            return Ok(());
        }

        let (tx, rx) = unbounded_channel::<MessageEvent>();
        {
            let mut guard = self.rx.lock().await;
            *guard = Some(rx);
        }

        let http_client = Arc::new(
            ClientBuilder::new()
                .token(self.token.clone())
                .timeout(Duration::from_secs(30))
                .build(),
        );
        self.http = Some(http_client.clone());

        let cache = InMemoryCache::builder()
            .resource_types(ResourceType::GUILD | ResourceType::CHANNEL | ResourceType::MEMBER)
            .build();
        let cache = Arc::new(cache);
        self.cache = Some(cache.clone());

        let config = Config::new(
            self.token.clone(),
            Intents::GUILDS | Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT,
        );

        let shards = gateway::create_recommended(&http_client, config, |_, b| b.build())
            .await
            .map_err(|e| {
                duckbot_common::Error::Platform(format!("create_recommended error: {e}"))
            })?;

        for shard in shards {
            self.shard_senders.push(shard.sender());

            let tx_for_shard = tx.clone();
            let http_for_shard = http_client.clone();
            let cache_for_shard = cache.clone();

            let handle = tokio::spawn(async move {
                shard_runner(shard, tx_for_shard, http_for_shard, cache_for_shard).await;
            });
            self.shard_tasks.push(handle);
        }

        self.connection_status = ConnectionStatus::Connected;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), duckbot_common::Error> {
        self.connection_status = ConnectionStatus::Disconnected;

        for sender in &self.shard_senders {
            let _ = sender.close(CloseFrame::NORMAL);
        }
        for task in &mut self.shard_tasks {
            let _ = task.await;
        }

        self.shard_senders.clear();
        self.shard_tasks.clear();

        {
            let mut guard = self.rx.lock().await;
            *guard = None;
        }

        Ok(())
    }

    async fn send_message(&self, channel: &str, message: &str) -> Result<(), duckbot_common::Error> {
        let channel_id_u64: u64 = channel
            .parse()
            .map_err(|_| duckbot_common::Error::Platform(format!("Invalid channel ID: {channel}")))?;
        let channel_id = Id::<ChannelMarker>::new(channel_id_u64);

        if let Some(http) = &self.http {
            http.create_message(channel_id)
                .content(message)
                .await
                .map_err(|e| {
                    duckbot_common::Error::Platform(format!("Error sending Discord message: {e:?}"))
                })?;
        }

        Ok(())
    }

    async fn get_connection_status(&self) -> Result<ConnectionStatus, duckbot_common::Error> {
        Ok(self.connection_status.clone())
    }
}
