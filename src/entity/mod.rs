//! Media player adapter bound to one tracked device.


use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::manager::device::{DeviceView, MediaPlayerAttributes};
use crate::tracker::{
    DeviceIdentity, DeviceListener, Notification, NotificationKind, SessionTracker, SubscriberError, SubscriptionHandle,
};

const ENTITY_LOG_TARGET: &str = "r_jellytrack::entity";

/// Change pushed to whoever renders the entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityUpdate {
    pub identity: DeviceIdentity,
    pub kind: NotificationKind,
    pub available: bool,
    pub attributes: Option<MediaPlayerAttributes>,
}

#[derive(Debug, Default)]
struct EntityState {
    available: bool,
    attributes: Option<MediaPlayerAttributes>,
    handles: Vec<SubscriptionHandle>,
}

/// Tracks availability and the last rendered attributes of one device.
///
/// Notifications arrive on the tracker's pass; rendering work is handed to
/// the optional update channel instead of being done inline.
#[derive(Debug)]
pub struct MediaPlayerEntity {
    identity: DeviceIdentity,
    server_url: String,
    state: Mutex<EntityState>,
    updates: Option<mpsc::UnboundedSender<EntityUpdate>>,
}

impl MediaPlayerEntity {
    pub fn new(identity: DeviceIdentity, server_url: &str) -> Self {
        MediaPlayerEntity {
            identity,
            server_url: server_url.to_string(),
            state: Mutex::new(EntityState::default()),
            updates: None,
        }
    }

    pub fn with_updates(mut self, updates: mpsc::UnboundedSender<EntityUpdate>) -> Self {
        self.updates = Some(updates);
        self
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn available(&self) -> bool {
        self.state.lock().map(|s| s.available).unwrap_or(false)
    }

    pub fn attributes(&self) -> Option<MediaPlayerAttributes> {
        self.state.lock().ok().and_then(|s| s.attributes.clone())
    }

    /// Subscribes to all three notification kinds and renders the current
    /// record, if the device is already known.
    pub async fn attach(self: &Arc<Self>, tracker: &SessionTracker) {
        let mut handles = Vec::with_capacity(3);
        for kind in [NotificationKind::NewDevice, NotificationKind::StaleDevice, NotificationKind::Update] {
            let listener: Arc<dyn DeviceListener> = self.clone();
            handles.push(tracker.subscribe_listener(kind, self.identity.clone(), listener).await);
        }

        let current = tracker.device(&self.identity).await;
        if let Ok(mut state) = self.state.lock() {
            state.handles.extend(handles);
            if let Some(record) = current {
                state.available = record.is_active();
                state.attributes = Some(DeviceView::new(&record, &self.server_url).attributes());
            }
        }
        debug!(target: ENTITY_LOG_TARGET, "Entity {} attached", self.identity);
    }

    /// Drops every subscription. Safe to call when `attach` never ran.
    pub async fn detach(&self, tracker: &SessionTracker) {
        let handles = match self.state.lock() {
            Ok(mut state) => std::mem::take(&mut state.handles),
            Err(_) => Vec::new(),
        };
        for handle in handles {
            tracker.unsubscribe(handle).await;
        }
        debug!(target: ENTITY_LOG_TARGET, "Entity {} detached", self.identity);
    }
}

impl DeviceListener for MediaPlayerEntity {
    fn receive(&self, notification: &Notification) -> Result<(), SubscriberError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| format!("entity {} state lock poisoned", self.identity))?;

        match &notification.record {
            Some(record) => {
                state.available = record.is_active();
                state.attributes = Some(DeviceView::new(record, &self.server_url).attributes());
            }
            None => {
                debug!(target: ENTITY_LOG_TARGET, "{} for {} without a record", notification.kind, self.identity);
                state.available = notification.kind != NotificationKind::StaleDevice;
            }
        }
        trace!(target: ENTITY_LOG_TARGET, "Entity {} got {}", self.identity, notification.kind);

        if let Some(updates) = &self.updates {
            let update = EntityUpdate {
                identity: self.identity.clone(),
                kind: notification.kind,
                available: state.available,
                attributes: state.attributes.clone(),
            };
            updates
                .send(update)
                .map_err(|_| format!("update receiver for {} dropped", self.identity))?;
        }
        Ok(())
    }
}
