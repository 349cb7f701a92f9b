//! Device tracking layer between `keybridge-api` and the presentation
//! framework hosting the bridge.
//!
//! This crate owns the two stateful subsystems of the bridge:
//!
//! - **[`DeviceSession`]** — one per physical light. Hydrates the full
//!   remote state over HTTP, then polls it on a fixed interval, raising a
//!   property-changed callback for every field that drifted from the
//!   cached snapshot. Exposes get/set for the three light properties.
//!
//! - **[`DeviceManager`]** — consumes the local-network discovery event
//!   stream, deduplicates devices by hardware identity, creates sessions
//!   for unseen devices, and reconciles each hydrated device onto a new
//!   or persisted [`AccessoryRecord`] keyed by a UUID derived from the
//!   serial number. The presentation side plugs in through the
//!   [`AccessoryBridge`] trait.
//!
//! Discovery transport (mDNS) and the accessory/characteristic object
//! model are external collaborators; only their data crosses into here.

pub mod config;
pub mod discovery;
pub mod error;
pub mod manager;
pub mod model;
pub mod session;

pub use config::BridgeConfig;
pub use discovery::{DiscoveryEvent, SERVICE_TYPE};
pub use error::CoreError;
pub use manager::{AccessoryBridge, DeviceManager};
pub use model::{AccessoryRecord, DeviceIdentity, DeviceRecord, accessory_uuid};
pub use session::DeviceSession;

// Re-export the wire model for consumers that only depend on this crate.
pub use keybridge_api::{
    DeviceInfo, DeviceOptions, DeviceSettings, LightProperty, LightState, MAX_TEMPERATURE,
    MIN_TEMPERATURE, NetworkLocation,
};
