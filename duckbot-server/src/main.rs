use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use duckbot_common::traits::platform_traits::PlatformIntegration;
use duckbot_common::Error as CommonError;
use duckbot_core::platforms::discord::{DiscordApiClient, DiscordPlatform};
use duckbot_core::services::ModerationService;
use duckbot_core::Error;

#[derive(Parser, Debug, Clone)]
#[command(name = "duckbot")]
#[command(author, version, about = "DuckBot - Discord spam watchdog and duckling tier roles")]
struct Args {
    /// Discord bot token; falls back to DISCORD_TOKEN from the environment.
    #[arg(long)]
    token: Option<String>,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("duckbot=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)
        .expect("Failed to set global subscriber");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Server error: {:?}", e);
    }
    info!("Main finished. Goodbye!");
    Ok(())
}

async fn run(args: Args) -> Result<(), Error> {
    let token = match args.token.or_else(|| std::env::var("DISCORD_TOKEN").ok()) {
        Some(t) => t,
        None => {
            return Err(CommonError::Platform(
                "No Discord token: pass --token or set DISCORD_TOKEN".into(),
            )
            .into());
        }
    };

    let mut platform = DiscordPlatform::new(token);
    platform.connect().await?;
    info!("Discord platform connected.");

    let http = platform
        .http
        .clone()
        .ok_or_else(|| CommonError::Platform("Discord HTTP client not available".into()))?;
    let moderation = Arc::new(ModerationService::new(Arc::new(DiscordApiClient::new(http))));

    // One task per inbound event; per-user ordering is the moderation
    // service's job, not the loop's.
    while let Some(event) = platform.next_message_event().await {
        let moderation = moderation.clone();
        tokio::spawn(async move {
            if let Err(e) = moderation.process(&event).await {
                error!("Error processing message {}: {:?}", event.message_id, e);
            }
        });
    }

    info!("Event stream ended; disconnecting.");
    platform.disconnect().await?;
    Ok(())
}
