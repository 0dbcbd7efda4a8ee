//! Headless magboard client: joins a campaign and logs sync state until Ctrl+C.

use magboard_client::{ClientConfig, HttpGateway, ShortcutRegistry, WhiteboardSession};
use magboard_core::clock::SystemClock;
use magboard_core::sync::SyncStatus;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ClientConfig::from_env()?;
    log::info!("Starting magboard client against {}", config.server_url);
    log::debug!("Keyboard shortcuts:\n{}", ShortcutRegistry::help_text());

    let gateway = Arc::new(HttpGateway::new(config.server_url.clone()));
    let session = WhiteboardSession::open(gateway, Arc::new(SystemClock), &config);

    let mut report = tokio::time::interval(Duration::from_secs(5));
    let mut last_status = SyncStatus::Connecting;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = report.tick() => {
                let status = session.status();
                if status != last_status {
                    log::info!("{}", status.label());
                    last_status = status;
                }
                log::debug!(
                    "{} elements, {} other users",
                    session.elements().len(),
                    session.peers().len()
                );
            }
        }
    }

    session.close().await?;
    Ok(())
}
