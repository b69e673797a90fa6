use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use twilight_model::id::marker::UserMarker;
use twilight_model::id::Id;

/// Consecutive-repeat count at which the user gets a warning reply.
pub const WARN_REPEAT_COUNT: u32 = 3;
/// Consecutive-repeat count at which the user is sanctioned.
pub const SANCTION_REPEAT_COUNT: u32 = 5;

/// Short-term memory of one user's last message. Pure cache: never
/// explicitly destroyed (except on sanction), safe to evict at any time.
#[derive(Debug, Clone)]
pub struct SpamRecord {
    last_content: String,
    last_attachment_size: Option<u64>,
    repeat_count: u32,
}

/// How the watchdog classified a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpamVerdict {
    /// First message seen from this user, or content/attachment changed.
    Fresh,
    /// Identical to the previous message; payload is the consecutive-repeat
    /// count (1 on the first repetition).
    Repeated(u32),
}

/// Tracks each active user's last message and classifies every new one as
/// a repeat or a reset. Escalation (warn/sanction) is the dispatcher's
/// business; the watchdog only counts.
pub struct SpamWatchdog {
    records: DashMap<Id<UserMarker>, SpamRecord>,
}

impl SpamWatchdog {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Classifies one message. Content is compared by exact equality: an
    /// empty string is a valid value, and a missing attachment is distinct
    /// from any present size.
    pub fn observe(
        &self,
        user_id: Id<UserMarker>,
        content: &str,
        attachment_size: Option<u64>,
    ) -> SpamVerdict {
        match self.records.entry(user_id) {
            Entry::Vacant(slot) => {
                // First message from a user is never spam.
                slot.insert(SpamRecord {
                    last_content: content.to_string(),
                    last_attachment_size: attachment_size,
                    repeat_count: 0,
                });
                SpamVerdict::Fresh
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                let same = record.last_content == content
                    && record.last_attachment_size == attachment_size;
                if !same {
                    record.last_content = content.to_string();
                    record.last_attachment_size = attachment_size;
                    record.repeat_count = 0;
                    SpamVerdict::Fresh
                } else {
                    record.repeat_count += 1;
                    SpamVerdict::Repeated(record.repeat_count)
                }
            }
        }
    }

    /// Drops a user's record. Used when the user is sanctioned and no
    /// longer tracked.
    pub fn forget(&self, user_id: Id<UserMarker>) {
        self.records.remove(&user_id);
    }

    pub fn is_tracking(&self, user_id: Id<UserMarker>) -> bool {
        self.records.contains_key(&user_id)
    }
}

impl Default for SpamWatchdog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(n: u64) -> Id<UserMarker> {
        Id::new(n)
    }

    #[test]
    fn first_message_is_fresh() {
        let dog = SpamWatchdog::new();
        assert_eq!(dog.observe(user(1), "hi", None), SpamVerdict::Fresh);
    }

    #[test]
    fn identical_messages_count_up() {
        let dog = SpamWatchdog::new();
        dog.observe(user(1), "hi", None);
        for expected in 1..=5 {
            assert_eq!(
                dog.observe(user(1), "hi", None),
                SpamVerdict::Repeated(expected)
            );
        }
    }

    #[test]
    fn different_content_resets() {
        let dog = SpamWatchdog::new();
        dog.observe(user(1), "hi", None);
        dog.observe(user(1), "hi", None);
        assert_eq!(dog.observe(user(1), "bye", None), SpamVerdict::Fresh);
        assert_eq!(dog.observe(user(1), "bye", None), SpamVerdict::Repeated(1));
    }

    #[test]
    fn attachment_size_is_part_of_the_pair() {
        let dog = SpamWatchdog::new();
        dog.observe(user(1), "hi", Some(42));
        // Same text, different attachment: not a repeat.
        assert_eq!(dog.observe(user(1), "hi", None), SpamVerdict::Fresh);
        assert_eq!(dog.observe(user(1), "hi", Some(7)), SpamVerdict::Fresh);
        assert_eq!(dog.observe(user(1), "hi", Some(7)), SpamVerdict::Repeated(1));
    }

    #[test]
    fn empty_content_is_a_value() {
        let dog = SpamWatchdog::new();
        dog.observe(user(1), "", Some(100));
        assert_eq!(dog.observe(user(1), "", Some(100)), SpamVerdict::Repeated(1));
        assert_eq!(dog.observe(user(1), "", Some(100)), SpamVerdict::Repeated(2));
    }

    #[test]
    fn users_are_tracked_independently() {
        let dog = SpamWatchdog::new();
        dog.observe(user(1), "hi", None);
        assert_eq!(dog.observe(user(2), "hi", None), SpamVerdict::Fresh);
        assert_eq!(dog.observe(user(1), "hi", None), SpamVerdict::Repeated(1));
        assert_eq!(dog.observe(user(2), "hi", None), SpamVerdict::Repeated(1));
    }

    #[test]
    fn forget_drops_tracking() {
        let dog = SpamWatchdog::new();
        dog.observe(user(1), "hi", None);
        dog.observe(user(1), "hi", None);
        dog.forget(user(1));
        assert!(!dog.is_tracking(user(1)));
        assert_eq!(dog.observe(user(1), "hi", None), SpamVerdict::Fresh);
    }

    #[test]
    fn sanction_count_reached_on_sixth_identical_message() {
        let dog = SpamWatchdog::new();
        let mut verdicts = vec![dog.observe(user(1), "hi", None)];
        for _ in 0..5 {
            verdicts.push(dog.observe(user(1), "hi", None));
        }
        assert_eq!(verdicts[0], SpamVerdict::Fresh);
        assert_eq!(verdicts[3], SpamVerdict::Repeated(WARN_REPEAT_COUNT));
        assert_eq!(verdicts[5], SpamVerdict::Repeated(SANCTION_REPEAT_COUNT));
    }
}
