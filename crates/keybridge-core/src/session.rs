// ── Device session ──
//
// One session per physical light, alive for the rest of the process.
// Hydrates the full remote state once, then mirrors it: a fixed-period
// poll task diffs the device against the cached snapshot and raises the
// property-changed callback per drifted field. Writes go straight to
// the device and become visible only through the next poll — the cache
// is never updated optimistically.

use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{debug, warn};

use keybridge_api::{
    DeviceInfo, DeviceOptions, DeviceSettings, LightClient, LightProperty, LightState,
    MAX_TEMPERATURE, MIN_TEMPERATURE, NetworkLocation,
};

use crate::error::CoreError;
use crate::model::{DeviceIdentity, DeviceRecord};

type PropertyListener = Box<dyn Fn(LightProperty, u16) + Send + Sync>;

/// A hydrated, continuously reconciled light.
///
/// Cheaply cloneable via `Arc`; the poll task holds one clone, the
/// manager and the presentation adapter hold others. There is no
/// shutdown path — sessions and their poll loops run for the life of
/// the process.
#[derive(Clone)]
pub struct DeviceSession {
    inner: Arc<SessionInner>,
}

// Hand-written: SessionInner holds the boxed listener callback.
impl fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("identity", &self.inner.identity)
            .field("friendly_name", &self.inner.friendly_name)
            .finish_non_exhaustive()
    }
}

struct SessionInner {
    identity: DeviceIdentity,
    friendly_name: String,
    client: LightClient,
    /// Static facts, read once during hydration.
    info: DeviceInfo,
    settings: RwLock<DeviceSettings>,
    /// Last successfully fetched state of the first light element.
    /// The hydration snapshot seeds it, so diffing starts from there.
    state: RwLock<Option<LightState>>,
    /// Single property-changed callback; last registration wins.
    listener: RwLock<Option<PropertyListener>>,
    poll_interval: Duration,
}

impl DeviceSession {
    /// Hydrate a discovered device and start its poll loop.
    ///
    /// Fetches info, options, and settings concurrently with a timeout
    /// equal to `poll_interval`. If any fetch fails the whole creation
    /// fails — there is no partial session and no retry; the device
    /// stays untracked until the next discovery broadcast.
    pub async fn connect(
        record: DeviceRecord,
        poll_interval: Duration,
    ) -> Result<Self, CoreError> {
        let client = LightClient::new(record.location.clone(), poll_interval)
            .map_err(|e| CoreError::hydration(record.friendly_name.clone(), e))?;

        let (info, options, settings) = tokio::try_join!(
            client.get_info(),
            client.get_options(),
            client.get_settings(),
        )
        .map_err(|e| CoreError::hydration(record.friendly_name.clone(), e))?;

        debug!(
            device = %record.friendly_name,
            serial = %info.serial_number,
            "hydrated device"
        );

        let session = Self {
            inner: Arc::new(SessionInner {
                identity: record.identity,
                friendly_name: record.friendly_name,
                client,
                info,
                settings: RwLock::new(settings),
                state: RwLock::new(options.first_light().copied()),
                listener: RwLock::new(None),
                poll_interval,
            }),
        };

        tokio::spawn(poll_task(session.clone()));
        Ok(session)
    }

    // ── Derived device facts ────────────────────────────────────────

    pub fn identity(&self) -> &DeviceIdentity {
        &self.inner.identity
    }

    pub fn serial_number(&self) -> &str {
        &self.inner.info.serial_number
    }

    /// The brand portion of the product name ("Elgato Key Light" → "Elgato").
    pub fn manufacturer(&self) -> &str {
        self.inner.info.product_name.split(' ').next().unwrap_or("")
    }

    pub fn model(&self) -> &str {
        &self.inner.info.product_name
    }

    /// The device-reported display name, falling back to the discovery
    /// service name when the device reports none.
    pub fn display_name(&self) -> &str {
        if self.inner.info.display_name.is_empty() {
            &self.inner.friendly_name
        } else {
            &self.inner.info.display_name
        }
    }

    pub fn firmware_version(&self) -> &str {
        &self.inner.info.firmware_version
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.inner.info
    }

    /// The cached settings block.
    pub fn settings(&self) -> DeviceSettings {
        self.inner
            .settings
            .read()
            .expect("settings lock poisoned")
            .clone()
    }

    /// The location requests are currently sent to.
    pub fn location(&self) -> NetworkLocation {
        self.inner.client.location()
    }

    // ── State access ────────────────────────────────────────────────

    /// Last-cached value of a light property, or `0` if none was ever
    /// observed. Never fails and never touches the network.
    pub fn get_property(&self, property: LightProperty) -> u16 {
        self.inner
            .state
            .read()
            .expect("state lock poisoned")
            .map_or(0, |light| light.get(property))
    }

    /// Write one property to the device.
    ///
    /// Temperature is clamped to the device's accepted range before
    /// transmission. The cache is deliberately NOT updated here — the
    /// new value becomes visible through the next successful poll, so
    /// callers must not assume immediate cache consistency.
    pub async fn set_property(&self, property: LightProperty, value: u16) -> Result<(), CoreError> {
        let value = match property {
            LightProperty::Temperature => value.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE),
            LightProperty::On | LightProperty::Brightness => value,
        };
        debug!(device = %self.display_name(), %property, value, "setting property");
        self.inner.client.set_option(property, value).await?;
        Ok(())
    }

    /// Push a settings block to the device, then re-read it to refresh
    /// the cache.
    ///
    /// A failed write leaves the cache untouched. A failed read-back
    /// sets the cache to the intended values rather than leaving it
    /// stale — the write did succeed.
    pub async fn update_settings(&self, desired: DeviceSettings) {
        if let Err(e) = self.inner.client.put_settings(&desired).await {
            warn!(device = %self.display_name(), error = %e, "updating device settings failed");
            return;
        }

        match self.inner.client.get_settings().await {
            Ok(fresh) => {
                *self.inner.settings.write().expect("settings lock poisoned") = fresh;
                debug!(device = %self.display_name(), "updated device settings");
            }
            Err(e) => {
                warn!(
                    device = %self.display_name(),
                    error = %e,
                    "reading settings back failed; trusting intended values"
                );
                *self.inner.settings.write().expect("settings lock poisoned") = desired;
            }
        }
    }

    /// Make the light blink so the user can spot it. Best-effort.
    pub async fn identify(&self) {
        if let Err(e) = self.inner.client.identify().await {
            debug!(device = %self.display_name(), error = %e, "identify failed");
        }
    }

    // ── Wiring ──────────────────────────────────────────────────────

    /// Register the property-changed callback. Exactly one callback is
    /// kept; registering again replaces the previous one.
    pub fn on_property_changed<F>(&self, callback: F)
    where
        F: Fn(LightProperty, u16) + Send + Sync + 'static,
    {
        *self.inner.listener.write().expect("listener lock poisoned") = Some(Box::new(callback));
    }

    /// Point the session at a new host/port after re-discovery.
    ///
    /// An in-flight poll finishes against the old location; the next
    /// cycle uses the new one.
    pub fn update_location(&self, location: NetworkLocation) {
        self.inner.client.set_location(location);
    }

    // ── Poll internals ──────────────────────────────────────────────

    /// Apply a freshly fetched options snapshot: notify per field that
    /// differs from the cached light, then replace the cache
    /// unconditionally.
    fn apply_snapshot(&self, options: &DeviceOptions) {
        let Some(new) = options.first_light().copied() else {
            // A snapshot without lights is malformed; keep the cache.
            warn!(device = %self.display_name(), "poll returned no light elements");
            return;
        };

        let previous = *self.inner.state.read().expect("state lock poisoned");
        if let Some(old) = previous {
            for property in [
                LightProperty::On,
                LightProperty::Temperature,
                LightProperty::Brightness,
            ] {
                let value = new.get(property);
                if old.get(property) != value {
                    self.notify(property, value);
                }
            }
        }

        *self.inner.state.write().expect("state lock poisoned") = Some(new);
    }

    fn notify(&self, property: LightProperty, value: u16) {
        debug!(device = %self.display_name(), %property, value, "property changed");
        let guard = self.inner.listener.read().expect("listener lock poisoned");
        if let Some(callback) = guard.as_ref() {
            callback(property, value);
        }
    }
}

/// Fixed-period poll loop for one session.
///
/// The fetch is awaited inside the loop, so at most one request per
/// session is ever in flight — a slow cycle delays the next tick
/// instead of overlapping it. Failures leave cache and cadence
/// untouched; there is no backoff and no termination.
async fn poll_task(session: DeviceSession) {
    let mut interval = tokio::time::interval(session.inner.poll_interval);
    interval.tick().await; // consume the immediate first tick

    loop {
        interval.tick().await;
        match session.inner.client.get_options().await {
            Ok(options) => session.apply_snapshot(&options),
            Err(e) => {
                // We'll try again next tick.
                debug!(device = %session.display_name(), error = %e, "poll failed");
            }
        }
    }
}
