use r_jellytrack::config::Settings;
use r_jellytrack::entity::{EntityUpdate, MediaPlayerEntity};
use r_jellytrack::init_app_dirs;
use r_jellytrack::jellyfin::{IncomingEvent, JellyfinApiContract, JellyfinClient, WebSocketHandler};
use r_jellytrack::logging;
use r_jellytrack::manager::{ClientManager, ManagerOptions};
use r_jellytrack::sensor::{count_sensors, ServerSensor};
use r_jellytrack::tracker::{DeviceIdentity, SessionTracker};
use r_jellytrack::ui::{Cli, Command, ControlAction};
use std::collections::HashMap;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::new();
    let args = &cli.args;
    logging::init(args.log_json)?;

    init_app_dirs()?;
    let config_path = match &args.config {
        Some(path) => Path::new(path).to_path_buf(),
        None => Settings::default_path(),
    };
    let mut settings = Settings::load(&config_path)?;
    cli.apply_overrides(&mut settings);

    let (device_id, generated) = settings.ensure_device_id();
    if generated {
        info!("Generated device id {}, saving to {}", device_id, config_path.display());
        settings.save(&config_path)?;
    }
    settings.validate()?;
    if settings.missing_user_context() {
        warn!("Upcoming or YAMC payloads are enabled without library_user_id; they will stay empty");
    }

    let api_key = settings.api_key.clone().unwrap_or_default();
    let client = JellyfinClient::new(&settings.server_url, settings.verify_ssl)?
        .with_api_key(&api_key)
        .with_device_id(&device_id);
    let api: Arc<dyn JellyfinApiContract> = Arc::new(client);
    let tracker = SessionTracker::shared();
    let manager = Arc::new(ClientManager::new(api, tracker.clone(), ManagerOptions::from(&settings)));

    if let Err(e) = manager.connect().await {
        cli.display_error(&e);
        return Err(e.into());
    }

    match cli.command() {
        Command::Watch => watch(&cli, manager.clone(), tracker, &settings, &api_key, &device_id).await?,
        Command::Sessions => {
            manager.refresh_sessions().await?;
            cli.display_devices(&tracker.devices().await, manager.server_url());
        }
        Command::Control { device, action, position, item } => {
            control(&manager, &DeviceIdentity::from(device.as_str()), action, position, item).await?;
        }
        Command::Scan => {
            manager.trigger_scan().await?;
            println!("Library scan started");
        }
        Command::Delete { item_id } => {
            manager.delete_item(&item_id).await?;
            println!("Deleted {}", item_id);
        }
        Command::Sensor { search, playlist, page } => {
            manager.refresh_sessions().await?;
            if let Some(page) = page {
                manager.yamc_set_page(page).await?;
            }
            if let Some(playlist) = playlist {
                manager.yamc_set_playlist(&playlist).await?;
            }
            match search {
                Some(term) => manager.search_item(&term).await?,
                None => manager.update_data().await?,
            };
            let data = manager.sensor_data().await;
            let output = serde_json::json!({
                "server": ServerSensor::render(&data),
                "counts": count_sensors(&data),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    manager.stop().await;
    Ok(())
}

async fn control(
    manager: &ClientManager,
    identity: &DeviceIdentity,
    action: ControlAction,
    position: Option<f64>,
    item: Option<String>,
) -> Result<(), BoxError> {
    manager.refresh_sessions().await?;
    let session_id = manager
        .session_id_for(identity)
        .await
        .ok_or_else(|| format!("Device {} is not connected", identity))?;

    if let Some(command) = action.playstate(position)? {
        manager.set_playstate(&session_id, command).await?;
        return Ok(());
    }

    let item_id = item.ok_or("this action needs --item")?;
    match action {
        ControlAction::Browse => manager.browse_item(&session_id, &item_id).await?,
        _ => manager.play_media(&session_id, &item_id).await?,
    }
    Ok(())
}

/// Follows the push channel, keeping one entity per device, until Ctrl+C.
async fn watch(
    cli: &Cli,
    manager: Arc<ClientManager>,
    tracker: Arc<SessionTracker>,
    settings: &Settings,
    api_key: &str,
    device_id: &str,
) -> Result<(), BoxError> {
    let (event_tx, mut event_rx) = mpsc::channel::<IncomingEvent>(32);
    let (update_tx, mut update_rx) = mpsc::unbounded_channel::<EntityUpdate>();
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

    let handler = WebSocketHandler::new(&settings.server_url, api_key, device_id, event_tx, shutdown_rx)?;
    let ws_task = tokio::spawn(handler.run());

    let mut entities: HashMap<DeviceIdentity, Arc<MediaPlayerEntity>> = HashMap::new();
    if let Err(e) = manager.refresh_sessions().await {
        cli.display_error(&e);
    }
    if let Err(e) = manager.update_data().await {
        cli.display_error(&e);
    }
    attach_new_devices(&manager, &tracker, &mut entities, &update_tx).await;
    cli.display_devices(&tracker.devices().await, manager.server_url());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Ctrl+C received, shutting down");
                break;
            }
            Some(update) = update_rx.recv() => cli.display_update(&update),
            event = event_rx.recv() => {
                let Some(event) = event else {
                    warn!("Push channel closed");
                    break;
                };
                if let Err(e) = manager.handle_event(event).await {
                    error!("Failed to handle event: {}", e);
                }
                attach_new_devices(&manager, &tracker, &mut entities, &update_tx).await;
            }
        }
    }

    let _ = shutdown_tx.send(());
    drop(event_rx);
    for entity in entities.values() {
        entity.detach(&tracker).await;
    }
    if let Err(e) = ws_task.await {
        error!("WebSocket task failed: {}", e);
    }
    Ok(())
}

/// Adds an entity for every tracked device that does not have one yet.
async fn attach_new_devices(
    manager: &ClientManager,
    tracker: &SessionTracker,
    entities: &mut HashMap<DeviceIdentity, Arc<MediaPlayerEntity>>,
    update_tx: &mpsc::UnboundedSender<EntityUpdate>,
) {
    for record in tracker.devices().await {
        if entities.contains_key(&record.identity) {
            continue;
        }
        let entity = Arc::new(
            MediaPlayerEntity::new(record.identity.clone(), manager.server_url()).with_updates(update_tx.clone()),
        );
        entity.attach(tracker).await;
        info!("Tracking {}", record.identity);
        entities.insert(record.identity.clone(), entity);
    }
}
