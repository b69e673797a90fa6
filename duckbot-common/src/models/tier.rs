/// Reputation tiers, ordered lowest to highest. Each tier is bound to a
/// half-open band of cumulative message counts; the bands partition the
/// positive integers with no gaps or overlaps. A count of 0 maps to no tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Hatchling,
    Nestling,
    Fledgling,
    Grownup,
}

impl Tier {
    /// All tiers, lowest first.
    pub const ALL: [Tier; 4] = [Tier::Hatchling, Tier::Nestling, Tier::Fledgling, Tier::Grownup];

    /// Maps a cumulative message count to its tier.
    pub fn for_count(count: u64) -> Option<Tier> {
        match count {
            0 => None,
            1..=9 => Some(Tier::Hatchling),
            10..=99 => Some(Tier::Nestling),
            100..=999 => Some(Tier::Fledgling),
            _ => Some(Tier::Grownup),
        }
    }

    /// The tier immediately below this one, if any.
    pub fn previous(self) -> Option<Tier> {
        match self {
            Tier::Hatchling => None,
            Tier::Nestling => Some(Tier::Hatchling),
            Tier::Fledgling => Some(Tier::Nestling),
            Tier::Grownup => Some(Tier::Fledgling),
        }
    }
}
