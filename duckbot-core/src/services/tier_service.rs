use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};
use twilight_model::id::marker::{GuildMarker, RoleMarker, UserMarker};
use twilight_model::id::Id;

use duckbot_common::models::{DucklingRole, Tier};
use duckbot_common::traits::ChatModerationApi;

use crate::Error;

/// Long-term per-user message counters. Monotonic, process lifetime,
/// volatile by design.
pub struct TierTracker {
    counts: DashMap<Id<UserMarker>, u64>,
}

impl TierTracker {
    pub fn new() -> Self {
        Self {
            counts: DashMap::new(),
        }
    }

    /// Adds one qualifying message and returns the new total.
    pub fn record_message(&self, user_id: Id<UserMarker>) -> u64 {
        let mut entry = self.counts.entry(user_id).or_insert(0);
        *entry += 1;
        *entry
    }

    pub fn total_for(&self, user_id: Id<UserMarker>) -> u64 {
        self.counts.get(&user_id).map(|c| *c).unwrap_or(0)
    }
}

impl Default for TierTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// The four tier role ids of one guild, resolved together.
#[derive(Debug, Clone, Copy)]
pub struct TierRoleSet {
    roles: [Id<RoleMarker>; 4],
}

impl TierRoleSet {
    pub fn role_for(&self, tier: Tier) -> Id<RoleMarker> {
        match tier {
            Tier::Hatchling => self.roles[0],
            Tier::Nestling => self.roles[1],
            Tier::Fledgling => self.roles[2],
            Tier::Grownup => self.roles[3],
        }
    }

    /// Role ids for `tier` and everything above it.
    pub fn at_or_above(&self, tier: Tier) -> &[Id<RoleMarker>] {
        match tier {
            Tier::Hatchling => &self.roles[0..4],
            Tier::Nestling => &self.roles[1..4],
            Tier::Fledgling => &self.roles[2..4],
            Tier::Grownup => &self.roles[3..4],
        }
    }
}

/// Per-guild cache of resolved role handles. Only a complete resolution is
/// cached, so a guild that grows its roles later starts promoting without
/// a restart.
pub struct RoleDirectory {
    api: Arc<dyn ChatModerationApi>,
    tier_roles: DashMap<Id<GuildMarker>, TierRoleSet>,
    sanction_roles: DashMap<Id<GuildMarker>, Id<RoleMarker>>,
}

impl RoleDirectory {
    pub fn new(api: Arc<dyn ChatModerationApi>) -> Self {
        Self {
            api,
            tier_roles: DashMap::new(),
            sanction_roles: DashMap::new(),
        }
    }

    /// Resolves the four tier roles for a guild, or `None` if any of them
    /// is missing there.
    pub async fn tier_roles(&self, guild_id: Id<GuildMarker>) -> Result<Option<TierRoleSet>, Error> {
        if let Some(cached) = self.tier_roles.get(&guild_id) {
            return Ok(Some(*cached));
        }

        let mut resolved = [Id::new(1); 4];
        for (idx, tier) in Tier::ALL.iter().enumerate() {
            let name = DucklingRole::from(*tier).guild_name();
            match self.api.find_role(guild_id, name).await? {
                Some(role_id) => resolved[idx] = role_id,
                None => {
                    debug!("Guild {guild_id} has no '{name}' role; tier promotion disabled");
                    return Ok(None);
                }
            }
        }

        let set = TierRoleSet { roles: resolved };
        self.tier_roles.insert(guild_id, set);
        Ok(Some(set))
    }

    /// Resolves the sanction role for a guild, if it exists there.
    pub async fn sanction_role(
        &self,
        guild_id: Id<GuildMarker>,
    ) -> Result<Option<Id<RoleMarker>>, Error> {
        if let Some(cached) = self.sanction_roles.get(&guild_id) {
            return Ok(Some(*cached));
        }

        let name = DucklingRole::BadDuckling.guild_name();
        match self.api.find_role(guild_id, name).await? {
            Some(role_id) => {
                self.sanction_roles.insert(guild_id, role_id);
                Ok(Some(role_id))
            }
            None => {
                warn!("Guild {guild_id} has no '{name}' role; sanctions disabled");
                Ok(None)
            }
        }
    }
}

/// A promotion the tier service decided on: remove the previous tier's
/// role (if held) and add the new tier's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierChange {
    pub remove: Option<Id<RoleMarker>>,
    pub add: Id<RoleMarker>,
    pub tier: Tier,
}

/// Maps cumulative message counts through the tier ladder and issues role
/// transitions. Never demotes; at most one tier role per user.
pub struct TierService {
    tracker: TierTracker,
    directory: Arc<RoleDirectory>,
    api: Arc<dyn ChatModerationApi>,
}

impl TierService {
    pub fn new(api: Arc<dyn ChatModerationApi>, directory: Arc<RoleDirectory>) -> Self {
        Self {
            tracker: TierTracker::new(),
            directory,
            api,
        }
    }

    pub fn tracker(&self) -> &TierTracker {
        &self.tracker
    }

    /// Counts one qualifying message for the user and applies a tier role
    /// transition when a band boundary is crossed. Missing tier roles make
    /// this a silent no-op (the counter still advances and the user is
    /// re-evaluated on their next message).
    pub async fn advance(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        held_roles: &[Id<RoleMarker>],
    ) -> Result<Option<TierChange>, Error> {
        let total = self.tracker.record_message(user_id);

        let Some(tier) = Tier::for_count(total) else {
            // Unreachable post-increment; kept as a guard.
            return Ok(None);
        };

        let Some(role_set) = self.directory.tier_roles(guild_id).await? else {
            return Ok(None);
        };

        // Idempotence guard: holding this tier's role or any higher one
        // means there is nothing to do (and nothing to downgrade).
        let already_there = role_set
            .at_or_above(tier)
            .iter()
            .any(|role_id| held_roles.contains(role_id));
        if already_there {
            return Ok(None);
        }

        let remove = tier
            .previous()
            .map(|prev| role_set.role_for(prev))
            .filter(|prev_role| held_roles.contains(prev_role));

        let change = TierChange {
            remove,
            add: role_set.role_for(tier),
            tier,
        };
        self.apply(guild_id, user_id, &change).await;
        Ok(Some(change))
    }

    /// Applies a role transition, logging and swallowing platform failures
    /// so a flaky call never takes down event processing.
    async fn apply(&self, guild_id: Id<GuildMarker>, user_id: Id<UserMarker>, change: &TierChange) {
        if let Some(old_role) = change.remove {
            if let Err(e) = self.api.remove_role(guild_id, user_id, old_role).await {
                warn!("Failed to remove old tier role from user {user_id}: {e:?}");
            }
        }
        if let Err(e) = self.api.add_role(guild_id, user_id, change.add).await {
            warn!("Failed to add tier role to user {user_id}: {e:?}");
        } else {
            info!(
                "User {user_id} promoted to {:?} in guild {guild_id}",
                change.tier
            );
        }
    }
}
