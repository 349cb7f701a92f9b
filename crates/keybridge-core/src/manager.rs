// ── Discovery & reconciliation manager ──
//
// Turns the raw discovery event stream into a stable set of tracked
// devices. Dedup happens on the hardware identity; reconciliation onto
// persisted accessory records happens on the serial-derived UUID, so a
// light that moves to a new address (or a new process start) keeps its
// accessory.

use std::sync::Arc;

use dashmap::{DashMap, Entry};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::BridgeConfig;
use crate::discovery::DiscoveryEvent;
use crate::model::{AccessoryRecord, DeviceIdentity, DeviceRecord, accessory_uuid};
use crate::session::DeviceSession;

/// Seam to the external presentation framework.
///
/// Implementations construct their presentation adapter for the device
/// and wire it to the session's property-changed callback; which of the
/// two methods fires tells them whether to register a fresh accessory
/// with the host or refresh a restored one.
pub trait AccessoryBridge: Send + Sync + 'static {
    /// A hydrated device matched a persisted accessory record.
    fn accessory_restored(&self, record: &AccessoryRecord, session: &DeviceSession);

    /// A hydrated device was seen for the first time.
    fn accessory_added(&self, record: &AccessoryRecord, session: &DeviceSession);
}

/// Owns the `identity -> session` and `uuid -> accessory` maps and
/// drives both from discovery events.
///
/// Cheaply cloneable via `Arc`; event handling tasks hold clones.
#[derive(Clone)]
pub struct DeviceManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    config: BridgeConfig,
    bridge: Arc<dyn AccessoryBridge>,
    /// Live sessions, keyed by hardware identity.
    sessions: DashMap<DeviceIdentity, DeviceSession>,
    /// Accessory records, keyed by serial-derived UUID. Pre-populated
    /// from persisted records at process start; never pruned.
    accessories: DashMap<Uuid, AccessoryRecord>,
    /// Identities with a hydration in flight. Guards against the same
    /// device being discovered twice before its first session exists.
    pending: DashMap<DeviceIdentity, ()>,
}

impl DeviceManager {
    pub fn new(config: BridgeConfig, bridge: Arc<dyn AccessoryBridge>) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                config,
                bridge,
                sessions: DashMap::new(),
                accessories: DashMap::new(),
                pending: DashMap::new(),
            }),
        }
    }

    /// Load accessory records the host framework restored from disk.
    /// Call before [`run`](Self::run) so rediscovered devices reconcile
    /// onto them instead of duplicating.
    pub fn restore_accessories(&self, records: impl IntoIterator<Item = AccessoryRecord>) {
        for record in records {
            info!(uuid = %record.uuid, name = %record.device.friendly_name, "loaded accessory from cache");
            self.inner.accessories.insert(record.uuid, record);
        }
    }

    /// Consume the discovery stream until the sender side closes.
    ///
    /// Each event is handled on its own task, so devices hydrate
    /// concurrently; the pending guard keeps one identity from
    /// hydrating twice.
    pub async fn run(&self, mut events: mpsc::Receiver<DiscoveryEvent>) {
        while let Some(event) = events.recv().await {
            let manager = self.clone();
            tokio::spawn(async move {
                manager.handle_discovery(event).await;
            });
        }
    }

    /// Process one discovery advertisement.
    pub async fn handle_discovery(&self, event: DiscoveryEvent) {
        let identity = event.identity();
        let location = event.location(self.inner.config.use_ip);
        debug!(name = %event.name, %identity, "discovery event");

        // Known device: just follow it to its (possibly new) address.
        if let Some(session) = self.inner.sessions.get(&identity) {
            debug!(name = %event.name, "known device; updating connection data");
            session.update_location(location);
            return;
        }

        if self.inner.pending.insert(identity.clone(), ()).is_some() {
            debug!(name = %event.name, "hydration already in flight; dropping event");
            return;
        }

        // Re-check after winning the guard: a session may have landed
        // between the lookup above and the insert.
        if let Some(session) = self.inner.sessions.get(&identity) {
            session.update_location(location);
            self.inner.pending.remove(&identity);
            return;
        }

        let record = DeviceRecord {
            identity: identity.clone(),
            location,
            friendly_name: event.name.clone(),
        };

        info!(name = %event.name, "discovered device on network");
        match DeviceSession::connect(record.clone(), self.inner.config.polling_rate).await {
            Ok(session) => self.configure_device(record, session).await,
            Err(e) => {
                warn!(name = %event.name, error = %e, "could not hydrate device; skipping");
            }
        }

        self.inner.pending.remove(&identity);
    }

    /// Reconcile a freshly hydrated device onto its accessory record
    /// and hand it to the presentation side.
    async fn configure_device(&self, record: DeviceRecord, session: DeviceSession) {
        // Push configured power-on settings before the accessory goes live.
        let desired = self.inner.config.desired_settings(&session.settings());
        session.update_settings(desired).await;

        let uuid = accessory_uuid(session.serial_number());
        debug!(device = %session.display_name(), %uuid, "derived accessory uuid");

        // Refresh-or-create atomically under the map entry, but notify
        // the bridge outside the guard. Two concurrent hydrations that
        // resolve to the same uuid take the occupied arm exactly once.
        let (accessory, restored) = match self.inner.accessories.entry(uuid) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().device = record.clone();
                (entry.get().clone(), true)
            }
            Entry::Vacant(entry) => {
                let accessory = AccessoryRecord {
                    uuid,
                    device: record.clone(),
                };
                entry.insert(accessory.clone());
                (accessory, false)
            }
        };

        if restored {
            info!(
                device = %session.display_name(),
                "restoring existing accessory from cache"
            );
            self.inner.bridge.accessory_restored(&accessory, &session);
        } else {
            info!(device = %session.display_name(), "adding new accessory");
            self.inner.bridge.accessory_added(&accessory, &session);
        }

        self.inner.sessions.insert(record.identity, session);
    }

    // ── Introspection ───────────────────────────────────────────────

    /// The live session for an identity, if one exists.
    pub fn session(&self, identity: &DeviceIdentity) -> Option<DeviceSession> {
        self.inner.sessions.get(identity).map(|s| s.value().clone())
    }

    /// The accessory record for a UUID, if one exists.
    pub fn accessory(&self, uuid: &Uuid) -> Option<AccessoryRecord> {
        self.inner.accessories.get(uuid).map(|a| a.value().clone())
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    pub fn accessory_count(&self) -> usize {
        self.inner.accessories.len()
    }
}
