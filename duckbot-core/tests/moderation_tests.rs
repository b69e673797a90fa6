//! tests/moderation_tests.rs
//!
//! End-to-end dispatch tests against a recording mock of the platform API.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, RoleMarker, UserMarker};
use twilight_model::id::Id;

use duckbot_common::models::MessageEvent;
use duckbot_common::traits::ChatModerationApi;
use duckbot_common::Error;
use duckbot_core::services::moderation_service::Outcome;
use duckbot_core::services::ModerationService;

const GUILD: u64 = 900;
const CHANNEL: u64 = 100;
const BAD_ROLE: u64 = 666;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    AddRole(Id<UserMarker>, Id<RoleMarker>),
    RemoveRole(Id<UserMarker>, Id<RoleMarker>),
    Reply(Id<ChannelMarker>, Id<MessageMarker>, String),
    Announce(Id<ChannelMarker>, String),
    Delete(Id<ChannelMarker>, Id<MessageMarker>),
}

/// Recording mock: role lookups come from a fixed name table, channel
/// history from a fixed map, and every mutation is appended to `calls`.
struct MockApi {
    roles: HashMap<&'static str, Id<RoleMarker>>,
    channels: Vec<Id<ChannelMarker>>,
    messages: HashMap<Id<ChannelMarker>, Vec<(Id<MessageMarker>, Id<UserMarker>)>>,
    failing_deletes: HashSet<Id<MessageMarker>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl MockApi {
    fn new() -> Self {
        Self {
            roles: HashMap::new(),
            channels: vec![],
            messages: HashMap::new(),
            failing_deletes: HashSet::new(),
            calls: Arc::new(Mutex::new(vec![])),
        }
    }

    fn with_bad_duckling_role(mut self) -> Self {
        self.roles.insert("bad duckling", Id::new(BAD_ROLE));
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModerationApi for MockApi {
    async fn find_role(
        &self,
        _guild_id: Id<GuildMarker>,
        name: &str,
    ) -> Result<Option<Id<RoleMarker>>, Error> {
        Ok(self.roles.get(name).copied())
    }

    async fn add_role(
        &self,
        _guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        role_id: Id<RoleMarker>,
    ) -> Result<(), Error> {
        self.calls.lock().unwrap().push(Call::AddRole(user_id, role_id));
        Ok(())
    }

    async fn remove_role(
        &self,
        _guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        role_id: Id<RoleMarker>,
    ) -> Result<(), Error> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::RemoveRole(user_id, role_id));
        Ok(())
    }

    async fn reply(
        &self,
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
        text: &str,
    ) -> Result<(), Error> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Reply(channel_id, message_id, text.to_string()));
        Ok(())
    }

    async fn announce(&self, channel_id: Id<ChannelMarker>, text: &str) -> Result<(), Error> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Announce(channel_id, text.to_string()));
        Ok(())
    }

    async fn guild_channels(
        &self,
        _guild_id: Id<GuildMarker>,
    ) -> Result<Vec<Id<ChannelMarker>>, Error> {
        Ok(self.channels.clone())
    }

    async fn channel_messages(
        &self,
        channel_id: Id<ChannelMarker>,
    ) -> Result<Vec<(Id<MessageMarker>, Id<UserMarker>)>, Error> {
        Ok(self.messages.get(&channel_id).cloned().unwrap_or_default())
    }

    async fn delete_message(
        &self,
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
    ) -> Result<(), Error> {
        if self.failing_deletes.contains(&message_id) {
            return Err(Error::Platform("cannot delete".into()));
        }
        self.calls
            .lock()
            .unwrap()
            .push(Call::Delete(channel_id, message_id));
        Ok(())
    }
}

struct EventBuilder {
    next_message_id: u64,
}

impl EventBuilder {
    fn new() -> Self {
        Self { next_message_id: 1 }
    }

    fn message(&mut self, author: u64, content: &str) -> MessageEvent {
        let id = self.next_message_id;
        self.next_message_id += 1;
        MessageEvent {
            guild_id: Some(Id::new(GUILD)),
            channel_id: Id::new(CHANNEL),
            message_id: Id::new(id),
            author_id: Id::new(author),
            author_name: format!("user{author}"),
            content: content.to_string(),
            attachment_size: None,
            author_roles: vec![],
            author_is_bot: false,
            author_is_owner: false,
            timestamp: Utc::now(),
        }
    }
}

#[tokio::test]
async fn six_identical_messages_warn_then_sanction() {
    let mut api = MockApi::new().with_bad_duckling_role();
    api.channels = vec![Id::new(CHANNEL), Id::new(101)];
    api.messages.insert(
        Id::new(CHANNEL),
        vec![
            (Id::new(1), Id::new(7)),
            (Id::new(2), Id::new(7)),
            (Id::new(50), Id::new(999)), // someone else's message
        ],
    );
    api.messages
        .insert(Id::new(101), vec![(Id::new(3), Id::new(7))]);

    let api = Arc::new(api);
    let service = ModerationService::new(api.clone());
    let mut events = EventBuilder::new();

    let mut outcomes = vec![];
    for _ in 0..6 {
        let event = events.message(7, "hi");
        outcomes.push(service.process(&event).await.unwrap());
    }

    assert_eq!(
        outcomes,
        vec![
            Outcome::Counted,   // fresh, counter created at 0
            Outcome::Counted,   // repeat 1
            Outcome::Counted,   // repeat 2
            Outcome::Warned,    // repeat 3
            Outcome::Counted,   // repeat 4
            Outcome::Sanctioned // repeat 5
        ]
    );

    let calls = api.calls();

    // Exactly one warning reply, on the 4th message.
    let replies: Vec<_> = calls
        .iter()
        .filter(|c| matches!(c, Call::Reply(_, _, _)))
        .collect();
    assert_eq!(replies.len(), 1);
    assert_eq!(
        replies[0],
        &Call::Reply(Id::new(CHANNEL), Id::new(4), "Sssh...".to_string())
    );

    // Sanction: announcement, role grant, tracking dropped.
    assert!(calls
        .iter()
        .any(|c| matches!(c, Call::Announce(_, text) if text.contains("bad duckling"))));
    assert!(calls.contains(&Call::AddRole(Id::new(7), Id::new(BAD_ROLE))));
    assert!(!service.watchdog().is_tracking(Id::new(7)));

    // Sweep deleted the spammer's messages in both channels, nobody else's.
    let deletes: HashSet<_> = calls
        .iter()
        .filter_map(|c| match c {
            Call::Delete(_, message_id) => Some(*message_id),
            _ => None,
        })
        .collect();
    assert_eq!(
        deletes,
        HashSet::from([Id::new(1), Id::new(2), Id::new(3)])
    );
}

#[tokio::test]
async fn changed_content_resets_the_counter() {
    let api = Arc::new(MockApi::new().with_bad_duckling_role());
    let service = ModerationService::new(api.clone());
    let mut events = EventBuilder::new();

    for _ in 0..3 {
        service.process(&events.message(7, "hi")).await.unwrap();
    }
    // A different message resets; three more repeats only reach count 3.
    service.process(&events.message(7, "bye")).await.unwrap();
    let mut outcomes = vec![];
    for _ in 0..3 {
        outcomes.push(service.process(&events.message(7, "bye")).await.unwrap());
    }

    assert_eq!(
        outcomes,
        vec![Outcome::Counted, Outcome::Counted, Outcome::Warned]
    );
    assert!(!api
        .calls()
        .iter()
        .any(|c| matches!(c, Call::AddRole(_, _))));
}

#[tokio::test]
async fn owner_is_exempt_no_matter_how_many_repeats() {
    let api = Arc::new(MockApi::new().with_bad_duckling_role());
    let service = ModerationService::new(api.clone());
    let mut events = EventBuilder::new();

    for _ in 0..50 {
        let mut event = events.message(7, "spam spam spam");
        event.author_is_owner = true;
        assert_eq!(service.process(&event).await.unwrap(), Outcome::Filtered);
    }

    assert!(api.calls().is_empty());
    assert!(!service.watchdog().is_tracking(Id::new(7)));
    assert_eq!(service.tiers().tracker().total_for(Id::new(7)), 0);
}

#[tokio::test]
async fn bots_and_guildless_messages_are_filtered() {
    let api = Arc::new(MockApi::new().with_bad_duckling_role());
    let service = ModerationService::new(api.clone());
    let mut events = EventBuilder::new();

    let mut bot_event = events.message(7, "hi");
    bot_event.author_is_bot = true;
    assert_eq!(service.process(&bot_event).await.unwrap(), Outcome::Filtered);

    let mut dm_event = events.message(7, "hi");
    dm_event.guild_id = None;
    assert_eq!(service.process(&dm_event).await.unwrap(), Outcome::Filtered);

    assert!(api.calls().is_empty());
    assert!(!service.watchdog().is_tracking(Id::new(7)));
}

#[tokio::test]
async fn sanctioned_author_is_terminal() {
    let api = Arc::new(MockApi::new().with_bad_duckling_role());
    let service = ModerationService::new(api.clone());
    let mut events = EventBuilder::new();

    for _ in 0..10 {
        let mut event = events.message(7, "hello again");
        event.author_roles = vec![Id::new(BAD_ROLE)];
        assert_eq!(service.process(&event).await.unwrap(), Outcome::Filtered);
    }

    assert!(!service.watchdog().is_tracking(Id::new(7)));
    assert_eq!(service.tiers().tracker().total_for(Id::new(7)), 0);
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn missing_sanction_role_aborts_the_sanction() {
    // No "bad duckling" role configured in the guild at all.
    let api = Arc::new(MockApi::new());
    let service = ModerationService::new(api.clone());
    let mut events = EventBuilder::new();

    let mut last = Outcome::Filtered;
    for _ in 0..6 {
        last = service.process(&events.message(7, "hi")).await.unwrap();
    }

    // The sanction count is still reached, but no role or delete call is
    // attempted and the user stays tracked.
    assert_eq!(last, Outcome::Sanctioned);
    assert!(!api
        .calls()
        .iter()
        .any(|c| matches!(c, Call::AddRole(_, _) | Call::Delete(_, _) | Call::Announce(_, _))));
    assert!(service.watchdog().is_tracking(Id::new(7)));
}

#[tokio::test]
async fn sweep_survives_partial_deletion_failure() {
    let mut api = MockApi::new().with_bad_duckling_role();
    api.channels = vec![Id::new(CHANNEL)];
    api.messages.insert(
        Id::new(CHANNEL),
        vec![
            (Id::new(1), Id::new(7)),
            (Id::new(2), Id::new(7)),
            (Id::new(3), Id::new(7)),
        ],
    );
    api.failing_deletes.insert(Id::new(2));

    let api = Arc::new(api);
    let service = ModerationService::new(api.clone());
    let mut events = EventBuilder::new();

    for _ in 0..6 {
        service.process(&events.message(7, "hi")).await.unwrap();
    }

    // Message 2 failed; 1 and 3 were still deleted.
    let deletes: HashSet<_> = api
        .calls()
        .iter()
        .filter_map(|c| match c {
            Call::Delete(_, message_id) => Some(*message_id),
            _ => None,
        })
        .collect();
    assert_eq!(deletes, HashSet::from([Id::new(1), Id::new(3)]));
}

#[tokio::test]
async fn attachment_size_distinguishes_messages() {
    let api = Arc::new(MockApi::new().with_bad_duckling_role());
    let service = ModerationService::new(api.clone());
    let mut events = EventBuilder::new();

    // Same empty text, alternating attachment sizes: never a repeat chain.
    for i in 0..10u64 {
        let mut event = events.message(7, "");
        event.attachment_size = Some(if i % 2 == 0 { 100 } else { 200 });
        let outcome = service.process(&event).await.unwrap();
        assert_ne!(outcome, Outcome::Sanctioned);
        assert_ne!(outcome, Outcome::Warned);
    }
    assert!(!api.calls().iter().any(|c| matches!(c, Call::Reply(_, _, _))));
}
