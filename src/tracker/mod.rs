//! Session tracking: maps volatile server sessions onto stable devices and
//! notifies subscribers about device changes.
//!
//! [`SessionTracker`] is the shared handle. It keeps the [`DeviceRegistry`] and
//! the [`Dispatcher`] behind a single lock so that a reconcile pass, including
//! the synchronous delivery of its notifications, never interleaves with
//! another pass, a subscription change or a registry read.

pub mod dispatcher;
pub mod identity;
pub mod registry;

pub use dispatcher::{
    DeviceListener, DispatchReport, Dispatcher, Notification, NotificationKind, SubscriberError, SubscriptionHandle,
};
pub use identity::{DeviceIdentity, MalformedRecord};
pub use registry::{DeviceRecord, DeviceRegistry, Fingerprint, Intent, Lifecycle, PlaybackState, ReconcileReport};

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::jellyfin::models::SessionInfo;

const TRACKER_LOG_TARGET: &str = "r_jellytrack::tracker";

/// Result of one reconcile-and-dispatch pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub reconcile: ReconcileReport,
    pub dispatch: DispatchReport,
}

#[derive(Debug, Default)]
struct TrackerState {
    registry: DeviceRegistry,
    dispatcher: Dispatcher,
}

/// Registry and dispatcher behind one exclusion lock.
///
/// The tokio mutex is fair, so passes queue in arrival order. Callbacks run
/// while the lock is held and must not call back into the tracker.
#[derive(Debug, Default)]
pub struct SessionTracker {
    state: Mutex<TrackerState>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Reconciles `sessions` and delivers the resulting notifications.
    #[instrument(skip(self, sessions), fields(sessions = sessions.len()))]
    pub async fn apply_snapshot(&self, sessions: &[SessionInfo]) -> PassReport {
        let mut state = self.state.lock().await;
        let reconcile = state.registry.reconcile(sessions);
        let dispatch = state.dispatcher.dispatch(&reconcile.intents, &state.registry);
        debug!(
            target: TRACKER_LOG_TARGET,
            "Pass done: {} intents, {} dropped, {} delivered, {} failed",
            reconcile.intents.len(),
            reconcile.dropped,
            dispatch.delivered,
            dispatch.failed
        );
        PassReport { reconcile, dispatch }
    }

    pub async fn subscribe<F>(&self, kind: NotificationKind, identity: DeviceIdentity, callback: F) -> SubscriptionHandle
    where
        F: Fn(&Notification) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        self.state.lock().await.dispatcher.subscribe(kind, identity, callback)
    }

    pub async fn subscribe_listener(
        &self,
        kind: NotificationKind,
        identity: DeviceIdentity,
        listener: Arc<dyn DeviceListener>,
    ) -> SubscriptionHandle {
        self.state.lock().await.dispatcher.subscribe_listener(kind, identity, listener)
    }

    pub async fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.state.lock().await.dispatcher.unsubscribe(handle)
    }

    pub async fn subscription_count(&self) -> usize {
        self.state.lock().await.dispatcher.len()
    }

    /// Copy of the record for `identity`, if it was ever seen.
    pub async fn device(&self, identity: &DeviceIdentity) -> Option<DeviceRecord> {
        self.state.lock().await.registry.get(identity).cloned()
    }

    /// Copies of all records, stale ones included.
    pub async fn devices(&self) -> Vec<DeviceRecord> {
        self.state.lock().await.registry.iter().cloned().collect()
    }

    /// Copy of the whole registry.
    pub async fn registry(&self) -> DeviceRegistry {
        self.state.lock().await.registry.clone()
    }

    pub async fn active_count(&self) -> usize {
        self.state.lock().await.registry.active_count()
    }

    pub async fn playing_count(&self) -> usize {
        self.state.lock().await.registry.playing_count()
    }
}
