//! Whalehook daemon entry point: relays Docker lifecycle events to a chat
//! webhook.

use log::{error, info};

mod bridge;
mod config;
mod error;
mod event;
mod notify;
mod runtime;
mod templates;

use bridge::Bridge;
use config::Config;
use notify::{Notify, WebhookNotifier};
use runtime::DockerSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    // Load configuration
    let cfg = Config::load()?;
    info!(
        "Starting whalehook bridge (filter: {}, hostname: {})",
        cfg.image_regexp, cfg.include_hostname
    );

    let notifier = WebhookNotifier::new(
        cfg.webhook_url.clone(),
        cfg.username.clone(),
        cfg.icon_emoji.clone(),
    );

    if let Err(e) = run(&cfg, &notifier).await {
        // Best-effort report to the channel, then give up. No restart.
        error!("Bridge failed: {:#}", e);
        notifier.send_error(&format!("{:#}", e)).await;
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cfg: &Config, notifier: &WebhookNotifier) -> anyhow::Result<()> {
    let bridge = Bridge::new(cfg)?;
    let source = DockerSource::connect()?;
    bridge.run(&source, notifier).await?;
    Ok(())
}
