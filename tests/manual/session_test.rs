//! Manual test for live session tracking
//!
//! Connects to the push channel and prints every device notification for two
//! minutes. Start and stop playback on a client to see the changes.

use std::env;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use r_jellytrack::jellyfin::{JellyfinApiContract, JellyfinClient, WebSocketHandler};
use r_jellytrack::manager::{ClientManager, ManagerOptions};
use r_jellytrack::tracker::{NotificationKind, SessionTracker};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let server_url = env::var("JELLYFIN_URL").map_err(|_| "JELLYFIN_URL must be set")?;
    let api_key = env::var("JELLYFIN_API_KEY").map_err(|_| "JELLYFIN_API_KEY must be set")?;

    println!("==== Jellyfin Session Test ====");
    println!("Server URL: {}", server_url);
    println!("API key: [redacted] ({} chars)", api_key.len());

    let device_id = Uuid::new_v4().to_string();
    println!("[TEST] Using dummy Device ID: {}", device_id);
    let client = JellyfinClient::new(&server_url, true)?
        .with_api_key(&api_key)
        .with_device_id(&device_id);
    let api: Arc<dyn JellyfinApiContract> = Arc::new(client);
    let tracker = SessionTracker::shared();
    let manager = Arc::new(ClientManager::new(api, tracker.clone(), ManagerOptions::default()));

    println!("\n[TEST] Step 1: Fetching the current sessions...");
    let info = manager.connect().await?;
    println!("[TEST] Connected to {} ({})", info.server_name, info.version);
    manager.refresh_sessions().await?;
    for record in tracker.devices().await {
        println!("[TEST] {} is {}", record.identity, record.fingerprint.state.as_str());
        for kind in [NotificationKind::StaleDevice, NotificationKind::Update] {
            tracker
                .subscribe(kind, record.identity.clone(), |n| {
                    println!("[TEST] {} -> {}", n.identity, n.kind);
                    Ok(())
                })
                .await;
        }
    }

    println!("\n[TEST] Step 2: Listening on the push channel for 2 minutes...");
    let (event_tx, event_rx) = mpsc::channel(32);
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    let handler = WebSocketHandler::new(manager.server_url(), &api_key, &device_id, event_tx, shutdown_rx)?;
    let ws_task = tokio::spawn(handler.run());
    let events_manager = manager.clone();
    let events_task = tokio::spawn(async move { events_manager.run_events(event_rx).await });

    tokio::time::sleep(Duration::from_secs(120)).await;

    let _ = shutdown_tx.send(());
    ws_task.await?;
    events_task.await?;
    println!(
        "\n[TEST] Done: {} active, {} playing",
        tracker.active_count().await,
        tracker.playing_count().await
    );
    Ok(())
}
