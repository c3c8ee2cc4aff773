//! Client manager: owns the server connection, feeds session snapshots to the
//! tracker and keeps the optional sensor payloads fresh.

pub mod device;
pub mod playlists;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, instrument, warn};

use crate::config::Settings;
use crate::jellyfin::api::{JellyfinApiContract, JellyfinError, QueryParams};
use crate::jellyfin::models::{ItemCounts, ItemsResponse, SystemInfo, TICKS_PER_SECOND};
use crate::jellyfin::stream::{resolve_stream, StreamSelection};
use crate::jellyfin::IncomingEvent;
use crate::sensor::SensorData;
use crate::tracker::{DeviceIdentity, PassReport, SessionTracker};
use playlists::{DEFAULT_PLAYLIST, NEXT_UP_PLAYLIST, YAMC_PAGE_SIZE};

const MANAGER_LOG_TARGET: &str = "r_jellytrack::manager";

/// The parts of [`Settings`] the manager acts on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManagerOptions {
    pub generate_upcoming: bool,
    pub generate_yamc: bool,
    pub library_user_id: Option<String>,
}

impl From<&Settings> for ManagerOptions {
    fn from(settings: &Settings) -> Self {
        ManagerOptions {
            generate_upcoming: settings.generate_upcoming,
            generate_yamc: settings.generate_yamc,
            library_user_id: settings.library_user_id.clone(),
        }
    }
}

/// Playback commands sent to a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaystateCommand {
    Unpause,
    Pause,
    Stop,
    NextTrack,
    PreviousTrack,
    Seek { position_secs: f64 },
}

impl PlaystateCommand {
    pub fn name(&self) -> &'static str {
        match self {
            PlaystateCommand::Unpause => "Unpause",
            PlaystateCommand::Pause => "Pause",
            PlaystateCommand::Stop => "Stop",
            PlaystateCommand::NextTrack => "NextTrack",
            PlaystateCommand::PreviousTrack => "PreviousTrack",
            PlaystateCommand::Seek { .. } => "Seek",
        }
    }

    fn params(&self) -> QueryParams {
        match self {
            PlaystateCommand::Seek { position_secs } => vec![
                (
                    "SeekPositionTicks".to_string(),
                    ((position_secs * TICKS_PER_SECOND as f64) as i64).to_string(),
                ),
                ("static".to_string(), "true".to_string()),
            ],
            _ => Vec::new(),
        }
    }
}

/// What one `update_data` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub upcoming_refreshed: bool,
    pub yamc_refreshed: bool,
    /// An optional payload was enabled but no library user is configured
    pub missing_user_context: bool,
}

#[derive(Debug, Default)]
struct ManagerState {
    info: Option<SystemInfo>,
    item_counts: Option<ItemCounts>,
    upcoming: Option<ItemsResponse>,
    yamc: Option<ItemsResponse>,
    yamc_streams: HashMap<String, StreamSelection>,
    yamc_page: u32,
    last_search: String,
    last_playlist: String,
}

fn param(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

/// Query for one YAMC page. The flag tells whether it goes to Next Up.
pub fn yamc_query(page: u32, search: &str, playlist: &str, user_id: &str) -> (QueryParams, bool) {
    let mut query = vec![
        param("startIndex", page.saturating_sub(1) * YAMC_PAGE_SIZE),
        param("limit", YAMC_PAGE_SIZE),
        param("userId", user_id),
        param("recursive", "true"),
        param("fields", "DateCreated,Studios,Genres,Taglines,ProviderIds,Ratings,MediaStreams"),
        param("collapseBoxSetItems", "false"),
        param("excludeItemTypes", "Folder"),
    ];

    if !search.is_empty() {
        query.push(param("searchTerm", search));
    } else if let Some(playlist) = playlists::find(playlist) {
        for (key, value) in playlist.query {
            match query.iter_mut().find(|(k, _)| k.as_str() == *key) {
                Some(entry) => entry.1 = value.to_string(),
                None => query.push(param(key, value)),
            }
        }
    } else {
        warn!(target: MANAGER_LOG_TARGET, "Unknown YAMC playlist '{}', listing without filter", playlist);
    }

    (query, search.is_empty() && playlist == NEXT_UP_PLAYLIST)
}

/// Shared hub between the Jellyfin connection, the session tracker and the
/// sensors.
pub struct ClientManager {
    api: Arc<dyn JellyfinApiContract>,
    tracker: Arc<SessionTracker>,
    options: ManagerOptions,
    state: Mutex<ManagerState>,
    available: AtomicBool,
}

impl ClientManager {
    pub fn new(api: Arc<dyn JellyfinApiContract>, tracker: Arc<SessionTracker>, options: ManagerOptions) -> Self {
        ClientManager {
            api,
            tracker,
            options,
            state: Mutex::new(ManagerState {
                yamc_page: 1,
                ..ManagerState::default()
            }),
            available: AtomicBool::new(false),
        }
    }

    pub fn api(&self) -> &Arc<dyn JellyfinApiContract> {
        &self.api
    }

    pub fn tracker(&self) -> &Arc<SessionTracker> {
        &self.tracker
    }

    pub fn server_url(&self) -> &str {
        self.api.server_url()
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Checks the server and credentials by reading `/System/Info`.
    #[instrument(skip(self))]
    pub async fn connect(&self) -> Result<SystemInfo, JellyfinError> {
        let info = self.api.system_info().await.map_err(|e| {
            error!(target: MANAGER_LOG_TARGET, "Unable to connect to Jellyfin: {}", e);
            e
        })?;
        info!(target: MANAGER_LOG_TARGET, "Connected to {} (Jellyfin {})", info.server_name, info.version);
        self.state.lock().await.info = Some(info.clone());
        self.available.store(true, Ordering::SeqCst);
        Ok(info)
    }

    /// Marks the manager unavailable. Tracked devices are left as they are.
    pub async fn stop(&self) {
        info!(target: MANAGER_LOG_TARGET, "Stopping client manager");
        self.available.store(false, Ordering::SeqCst);
    }

    pub async fn info(&self) -> Option<SystemInfo> {
        if !self.is_available() {
            return None;
        }
        self.state.lock().await.info.clone()
    }

    /// Fetches `/Sessions` and reconciles it. A failed fetch is returned as-is
    /// and leaves every device in its current state.
    #[instrument(skip(self))]
    pub async fn refresh_sessions(&self) -> Result<PassReport, JellyfinError> {
        let sessions = match self.api.fetch_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(target: MANAGER_LOG_TARGET, "Session fetch failed, keeping current devices: {}", e);
                return Err(e);
            }
        };
        Ok(self.tracker.apply_snapshot(&sessions).await)
    }

    /// Applies one push event.
    pub async fn handle_event(&self, event: IncomingEvent) -> Result<(), JellyfinError> {
        match event {
            IncomingEvent::Sessions(sessions) => {
                self.tracker.apply_snapshot(&sessions).await;
            }
            IncomingEvent::Connected => {
                self.refresh_sessions().await?;
            }
            IncomingEvent::LibraryChanged | IncomingEvent::UserDataChanged => {
                debug!(target: MANAGER_LOG_TARGET, "{:?}: refreshing sensor data", event);
                self.update_data().await?;
            }
            IncomingEvent::Disconnected => {
                debug!(target: MANAGER_LOG_TARGET, "Push channel disconnected; devices unchanged");
            }
            IncomingEvent::Other(message_type) => {
                debug!(target: MANAGER_LOG_TARGET, "Event: {}", message_type);
            }
        }
        Ok(())
    }

    /// Handles push events until the sender side closes.
    pub async fn run_events(&self, mut events: mpsc::Receiver<IncomingEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle_event(event).await {
                error!(target: MANAGER_LOG_TARGET, "Failed to handle event: {}", e);
            }
        }
        debug!(target: MANAGER_LOG_TARGET, "Event channel closed");
    }

    fn library_user(&self) -> Option<&str> {
        self.options.library_user_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Refreshes the library item counts and the enabled optional payloads.
    ///
    /// An enabled payload without a library user is skipped and cleared, with
    /// a single warning for the whole call; that is not an error.
    #[instrument(skip(self))]
    pub async fn update_data(&self) -> Result<UpdateOutcome, JellyfinError> {
        let mut outcome = UpdateOutcome::default();
        let mut skipped = Vec::new();
        let user_id = self.library_user();

        match self.api.item_counts(user_id).await {
            Ok(counts) => self.state.lock().await.item_counts = Some(counts),
            Err(e) => warn!(target: MANAGER_LOG_TARGET, "Item count refresh failed, keeping previous counts: {}", e),
        }

        if self.options.generate_upcoming {
            match user_id {
                Some(user_id) => {
                    let query = vec![
                        param("Limit", YAMC_PAGE_SIZE),
                        param("UserId", user_id),
                        param("fields", "DateCreated,Studios,Genres"),
                        param("excludeItemTypes", "Folder"),
                    ];
                    let next_up = self.api.next_up(&query).await?;
                    debug!(target: MANAGER_LOG_TARGET, "Next Up returned {} items", next_up.items.len());
                    self.state.lock().await.upcoming = Some(next_up);
                    outcome.upcoming_refreshed = true;
                }
                None => {
                    skipped.push("Upcoming media");
                    self.state.lock().await.upcoming = None;
                }
            }
        }

        if self.options.generate_yamc {
            match user_id {
                Some(user_id) => {
                    self.refresh_yamc(user_id).await?;
                    outcome.yamc_refreshed = true;
                }
                None => {
                    skipped.push("YAMC data");
                    let mut state = self.state.lock().await;
                    state.yamc = None;
                    state.yamc_streams.clear();
                }
            }
        }

        if !skipped.is_empty() {
            warn!(
                target: MANAGER_LOG_TARGET,
                "{} enabled but no Jellyfin library user configured; skipping update",
                skipped.join(" and ")
            );
            outcome.missing_user_context = true;
        }
        Ok(outcome)
    }

    async fn refresh_yamc(&self, user_id: &str) -> Result<(), JellyfinError> {
        let (query, next_up) = {
            let mut state = self.state.lock().await;
            if state.last_playlist.is_empty() {
                state.last_playlist = DEFAULT_PLAYLIST.to_string();
            }
            yamc_query(state.yamc_page, &state.last_search, &state.last_playlist, user_id)
        };

        let page = if next_up {
            self.api.next_up(&query).await?
        } else {
            self.api.items(&query).await?
        };

        let mut streams = HashMap::new();
        for item in &page.items {
            match resolve_stream(self.api.as_ref(), &item.id, &item.media_type, Some(user_id)).await {
                Ok(Some(selection)) => {
                    streams.insert(item.id.clone(), selection);
                }
                Ok(None) => {}
                Err(e) => warn!(target: MANAGER_LOG_TARGET, "No stream for item {}: {}", item.id, e),
            }
        }

        let mut state = self.state.lock().await;
        state.yamc = Some(page);
        state.yamc_streams = streams;
        Ok(())
    }

    /// `POST /Library/Refresh`
    pub async fn trigger_scan(&self) -> Result<(), JellyfinError> {
        info!(target: MANAGER_LOG_TARGET, "Library scan triggered");
        self.api.refresh_library().await
    }

    pub async fn delete_item(&self, item_id: &str) -> Result<UpdateOutcome, JellyfinError> {
        self.api.delete_item(item_id).await?;
        self.update_data().await
    }

    /// Searches YAMC from the first page.
    pub async fn search_item(&self, search_term: &str) -> Result<UpdateOutcome, JellyfinError> {
        {
            let mut state = self.state.lock().await;
            state.yamc_page = 1;
            state.last_search = search_term.to_string();
        }
        self.update_data().await
    }

    pub async fn yamc_set_page(&self, page: u32) -> Result<UpdateOutcome, JellyfinError> {
        self.state.lock().await.yamc_page = page.max(1);
        self.update_data().await
    }

    /// Switches playlists; this ends any active search.
    pub async fn yamc_set_playlist(&self, playlist: &str) -> Result<UpdateOutcome, JellyfinError> {
        {
            let mut state = self.state.lock().await;
            state.last_search.clear();
            state.last_playlist = playlist.to_string();
        }
        self.update_data().await
    }

    /// Session id a device is currently reachable under.
    pub async fn session_id_for(&self, identity: &DeviceIdentity) -> Option<String> {
        self.tracker
            .device(identity)
            .await
            .filter(|record| record.is_active())
            .and_then(|record| record.session.id)
    }

    #[instrument(skip(self))]
    pub async fn set_playstate(&self, session_id: &str, command: PlaystateCommand) -> Result<(), JellyfinError> {
        let path = format!("Playing/{}", command.name());
        self.api.post_session_command(session_id, &path, &command.params()).await
    }

    #[instrument(skip(self))]
    pub async fn play_media(&self, session_id: &str, item_id: &str) -> Result<(), JellyfinError> {
        let params = vec![param("playCommand", "PlayNow"), param("itemIds", item_id)];
        self.api.post_session_command(session_id, "Playing", &params).await
    }

    /// Makes the session's UI navigate to `item_id`.
    #[instrument(skip(self))]
    pub async fn browse_item(&self, session_id: &str, item_id: &str) -> Result<(), JellyfinError> {
        let item = self.api.get_item(item_id, self.library_user()).await?;
        let params = vec![
            param("itemId", item_id),
            param("itemType", &item.media_type),
            param("itemName", item.name.as_deref().unwrap_or_default()),
        ];
        self.api.post_session_command(session_id, "Viewing", &params).await
    }

    /// Playable stream for an item.
    pub async fn stream_for(&self, item_id: &str, media_type: &str) -> Result<Option<StreamSelection>, JellyfinError> {
        resolve_stream(self.api.as_ref(), item_id, media_type, self.library_user()).await
    }

    /// Snapshot of everything the sensors render.
    pub async fn sensor_data(&self) -> SensorData {
        let connected_sessions = self.tracker.active_count().await;
        let playing_sessions = self.tracker.playing_count().await;
        let state = self.state.lock().await;
        SensorData {
            server_url: self.server_url().to_string(),
            available: self.is_available(),
            info: state.info.clone(),
            item_counts: state.item_counts,
            generate_upcoming: self.options.generate_upcoming,
            generate_yamc: self.options.generate_yamc,
            upcoming: state.upcoming.clone(),
            yamc: state.yamc.clone(),
            yamc_streams: state.yamc_streams.clone(),
            yamc_page: state.yamc_page,
            last_search: state.last_search.clone(),
            last_playlist: state.last_playlist.clone(),
            connected_sessions,
            playing_sessions,
        }
    }
}
