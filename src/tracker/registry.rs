//! Device registry: folds session snapshots into a stable set of device records.

use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace, warn};

use super::dispatcher::NotificationKind;
use super::identity::DeviceIdentity;
use crate::jellyfin::models::SessionInfo;

const REGISTRY_LOG_TARGET: &str = "r_jellytrack::tracker::registry";

/// Whether a device appeared in the most recent successful snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Lifecycle {
    Active,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackState {
    Playing,
    Paused,
    Idle,
    /// Device is stale
    Off,
}

impl PlaybackState {
    /// Playback state as reported by an active session.
    pub fn of_session(session: &SessionInfo) -> Self {
        match (&session.now_playing_item, &session.play_state) {
            (None, _) => PlaybackState::Idle,
            (Some(_), Some(play_state)) if play_state.is_paused => PlaybackState::Paused,
            (Some(_), _) => PlaybackState::Playing,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Idle => "idle",
            PlaybackState::Off => "off",
        }
    }
}

/// The externally visible part of a session; update notifications fire only
/// when it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fingerprint {
    pub state: PlaybackState,
    pub position_ticks: Option<i64>,
    pub item_id: Option<String>,
    pub is_paused: bool,
    pub is_muted: bool,
}

impl Fingerprint {
    pub fn of_session(session: &SessionInfo) -> Self {
        let play_state = session.play_state.clone().unwrap_or_default();
        Fingerprint {
            state: PlaybackState::of_session(session),
            position_ticks: play_state.position_ticks,
            item_id: session.now_playing_item.as_ref().map(|item| item.id.clone()),
            is_paused: play_state.is_paused,
            is_muted: play_state.is_muted,
        }
    }
}

/// Theme songs and videos play in the background while browsing.
fn plays_theme_media(session: &SessionInfo) -> bool {
    session.now_playing_item.as_ref().map_or(false, |item| item.is_theme_media)
}

/// Everything the registry knows about one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRecord {
    pub identity: DeviceIdentity,
    /// Last session seen for this device
    pub session: SessionInfo,
    pub lifecycle: Lifecycle,
    /// Fingerprint of the last dispatched state
    pub fingerprint: Fingerprint,
}

impl DeviceRecord {
    fn new(identity: DeviceIdentity, session: SessionInfo) -> Self {
        let fingerprint = Fingerprint::of_session(&session);
        DeviceRecord {
            identity,
            session,
            lifecycle: Lifecycle::Active,
            fingerprint,
        }
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }

    /// Active and playing something, paused or not.
    pub fn is_playing(&self) -> bool {
        self.is_active() && matches!(self.fingerprint.state, PlaybackState::Playing | PlaybackState::Paused)
    }
}

/// A pending notification produced by [`DeviceRegistry::reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// First sighting, or reactivation of a stale device
    NewDevice(DeviceIdentity),
    StaleDevice(DeviceIdentity),
    Update(DeviceIdentity),
}

impl Intent {
    pub fn identity(&self) -> &DeviceIdentity {
        match self {
            Intent::NewDevice(id) | Intent::StaleDevice(id) | Intent::Update(id) => id,
        }
    }

    pub fn kind(&self) -> NotificationKind {
        match self {
            Intent::NewDevice(_) => NotificationKind::NewDevice,
            Intent::StaleDevice(_) => NotificationKind::StaleDevice,
            Intent::Update(_) => NotificationKind::Update,
        }
    }
}

/// Outcome of one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub intents: Vec<Intent>,
    /// Customised records dropped for lacking identity fields
    pub dropped: usize,
}

/// Identity-keyed device records. Records are created on first sighting and
/// then only move between `Active` and `Stale`; nothing is ever removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceRegistry {
    records: BTreeMap<DeviceIdentity, DeviceRecord>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one successful session snapshot and returns the resulting
    /// intents, at most one per identity.
    pub fn reconcile(&mut self, snapshot: &[SessionInfo]) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        // Later duplicates replace earlier ones but keep the first position.
        let mut surviving: Vec<(DeviceIdentity, &SessionInfo)> = Vec::new();
        let mut positions: HashMap<DeviceIdentity, usize> = HashMap::new();
        for session in snapshot {
            let identity = match DeviceIdentity::from_session(session) {
                Ok(Some(identity)) => identity,
                Ok(None) => {
                    trace!(target: REGISTRY_LOG_TARGET, "Ignoring non-customised session {:?}", session.id);
                    continue;
                }
                Err(malformed) => {
                    warn!(target: REGISTRY_LOG_TARGET, "Dropping malformed session record: {}", malformed);
                    report.dropped += 1;
                    continue;
                }
            };
            match positions.get(&identity) {
                Some(&index) => {
                    debug!(target: REGISTRY_LOG_TARGET, "Duplicate identity {} in snapshot, keeping the later record", identity);
                    surviving[index].1 = session;
                }
                None => {
                    positions.insert(identity.clone(), surviving.len());
                    surviving.push((identity, session));
                }
            }
        }

        for (identity, session) in surviving {
            if let Some(intent) = self.observe(identity, session) {
                report.intents.push(intent);
            }
        }

        for record in self.records.values_mut() {
            if record.is_active() && !positions.contains_key(&record.identity) {
                debug!(target: REGISTRY_LOG_TARGET, "Device {} went stale", record.identity);
                record.lifecycle = Lifecycle::Stale;
                report.intents.push(Intent::StaleDevice(record.identity.clone()));
            }
        }

        report
    }

    /// Records a sighting of `identity` and returns the intent it produces, if any.
    fn observe(&mut self, identity: DeviceIdentity, session: &SessionInfo) -> Option<Intent> {
        let record = match self.records.entry(identity.clone()) {
            Entry::Vacant(slot) => {
                debug!(target: REGISTRY_LOG_TARGET, "New device {}", identity);
                slot.insert(DeviceRecord::new(identity.clone(), session.clone()));
                return Some(Intent::NewDevice(identity));
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        let fingerprint = Fingerprint::of_session(session);
        let theme_media = plays_theme_media(&record.session) || plays_theme_media(session);
        record.session = session.clone();
        match record.lifecycle {
            Lifecycle::Stale => {
                debug!(target: REGISTRY_LOG_TARGET, "Device {} reactivated", identity);
                record.lifecycle = Lifecycle::Active;
                record.fingerprint = fingerprint;
                Some(Intent::NewDevice(identity))
            }
            Lifecycle::Active if theme_media => {
                trace!(target: REGISTRY_LOG_TARGET, "Device {} is on theme media, update suppressed", identity);
                record.fingerprint = fingerprint;
                None
            }
            Lifecycle::Active if record.fingerprint != fingerprint => {
                trace!(target: REGISTRY_LOG_TARGET, "Device {} changed: {:?}", identity, fingerprint);
                record.fingerprint = fingerprint;
                Some(Intent::Update(identity))
            }
            Lifecycle::Active => None,
        }
    }

    pub fn get(&self, identity: &DeviceIdentity) -> Option<&DeviceRecord> {
        self.records.get(identity)
    }

    /// Records in identity order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.iter().filter(|r| r.is_active()).count()
    }

    pub fn playing_count(&self) -> usize {
        self.iter().filter(|r| r.is_playing()).count()
    }
}
