// File: src/platforms/discord/mod.rs

pub mod api;
pub mod runtime;

pub use api::DiscordApiClient;
pub use runtime::DiscordPlatform;
