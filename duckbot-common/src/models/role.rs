use crate::models::tier::Tier;

/// The five guild roles this bot manages: one per reputation tier plus the
/// sanction marker. A closed enumeration so role lookups happen once per
/// guild instead of by string match on every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DucklingRole {
    Hatchling,
    Nestling,
    Fledgling,
    Grownup,
    /// Terminal sanction marker; a user holding this role is ignored.
    BadDuckling,
}

impl DucklingRole {
    /// Role display name as it must appear in the guild's role list.
    pub fn guild_name(self) -> &'static str {
        match self {
            DucklingRole::Hatchling => "hatchling",
            DucklingRole::Nestling => "nestling",
            DucklingRole::Fledgling => "fledgling",
            DucklingRole::Grownup => "grown-up duckling",
            DucklingRole::BadDuckling => "bad duckling",
        }
    }
}

impl From<Tier> for DucklingRole {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Hatchling => DucklingRole::Hatchling,
            Tier::Nestling => DucklingRole::Nestling,
            Tier::Fledgling => DucklingRole::Fledgling,
            Tier::Grownup => DucklingRole::Grownup,
        }
    }
}
