// File: src/services/mod.rs

pub mod moderation_service;
pub mod spam_watchdog;
pub mod tier_service;

pub use moderation_service::{ModerationService, Outcome};
pub use spam_watchdog::{SpamVerdict, SpamWatchdog};
pub use tier_service::{TierService, TierTracker};
