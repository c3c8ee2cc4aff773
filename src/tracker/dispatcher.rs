//! Identity-keyed fan-out of registry intents to subscribers.

use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, trace};

use super::identity::DeviceIdentity;
use super::registry::{DeviceRecord, DeviceRegistry, Intent};

const DISPATCH_LOG_TARGET: &str = "r_jellytrack::tracker::dispatcher";

/// Error returned by a notification callback.
pub type SubscriberError = Box<dyn Error + Send + Sync>;

/// Callback invoked for every matching notification.
pub type Callback = Box<dyn Fn(&Notification) -> Result<(), SubscriberError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NotificationKind {
    NewDevice,
    StaleDevice,
    Update,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NotificationKind::NewDevice => "new_device",
            NotificationKind::StaleDevice => "stale_device",
            NotificationKind::Update => "update",
        };
        f.write_str(name)
    }
}

/// What a subscriber receives.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub identity: DeviceIdentity,
    /// Snapshot of the device record after the pass. Stale records keep
    /// their last session data with `Lifecycle::Stale`.
    pub record: Option<DeviceRecord>,
}

/// Receiver side of the dispatcher for adapter types.
pub trait DeviceListener: Send + Sync {
    fn receive(&self, notification: &Notification) -> Result<(), SubscriberError>;
}

/// Opaque token returned by `subscribe`, required to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

struct Subscription {
    handle: SubscriptionHandle,
    kind: NotificationKind,
    identity: DeviceIdentity,
    callback: Callback,
}

/// Counts from one `dispatch` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    /// Callbacks that returned an error or panicked
    pub failed: usize,
}

#[derive(Default)]
pub struct Dispatcher {
    subscriptions: Vec<Subscription>,
    next_handle: u64,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `kind` notifications about `identity`.
    pub fn subscribe<F>(&mut self, kind: NotificationKind, identity: DeviceIdentity, callback: F) -> SubscriptionHandle
    where
        F: Fn(&Notification) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        self.next_handle += 1;
        let handle = SubscriptionHandle(self.next_handle);
        trace!(target: DISPATCH_LOG_TARGET, "Subscribed {:?} to {} for {}", handle, kind, identity);
        self.subscriptions.push(Subscription {
            handle,
            kind,
            identity,
            callback: Box::new(callback),
        });
        handle
    }

    /// Registers a [`DeviceListener`] the same way as a closure.
    pub fn subscribe_listener(
        &mut self,
        kind: NotificationKind,
        identity: DeviceIdentity,
        listener: Arc<dyn DeviceListener>,
    ) -> SubscriptionHandle {
        self.subscribe(kind, identity, move |notification| listener.receive(notification))
    }

    /// Removes the registration behind `handle`. Unknown handles are ignored;
    /// the return value tells whether anything was removed.
    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) -> bool {
        match self.subscriptions.iter().position(|s| s.handle == handle) {
            Some(index) => {
                let removed = self.subscriptions.remove(index);
                trace!(target: DISPATCH_LOG_TARGET, "Unsubscribed {:?} ({} for {})", handle, removed.kind, removed.identity);
                true
            }
            None => {
                debug!(target: DISPATCH_LOG_TARGET, "Unsubscribe of unknown handle {:?} ignored", handle);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Delivers every intent to its subscribers, in intent order and then
    /// registration order. A failing subscriber never stops delivery to the
    /// others.
    pub fn dispatch(&self, intents: &[Intent], registry: &DeviceRegistry) -> DispatchReport {
        let mut report = DispatchReport::default();
        for intent in intents {
            let kind = intent.kind();
            let notification = Notification {
                kind,
                identity: intent.identity().clone(),
                record: registry.get(intent.identity()).cloned(),
            };

            for subscription in self
                .subscriptions
                .iter()
                .filter(|s| s.kind == kind && s.identity == notification.identity)
            {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| (subscription.callback)(&notification)));
                match outcome {
                    Ok(Ok(())) => report.delivered += 1,
                    Ok(Err(e)) => {
                        error!(target: DISPATCH_LOG_TARGET, "Subscriber {:?} failed on {} for {}: {}", subscription.handle, kind, notification.identity, e);
                        report.failed += 1;
                    }
                    Err(_) => {
                        error!(target: DISPATCH_LOG_TARGET, "Subscriber {:?} panicked on {} for {}", subscription.handle, kind, notification.identity);
                        report.failed += 1;
                    }
                }
            }
        }
        report
    }
}
