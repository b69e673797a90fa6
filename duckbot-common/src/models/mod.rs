// File: duckbot-common/src/models/mod.rs
pub mod message;
pub mod role;
pub mod tier;

pub use message::MessageEvent;
pub use role::DucklingRole;
pub use tier::Tier;
