// File: duckbot-common/src/traits/mod.rs
pub mod api;
pub mod platform_traits;

pub use api::ChatModerationApi;
