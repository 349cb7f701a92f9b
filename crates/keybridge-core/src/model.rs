// ── Core identity types ──
//
// DeviceIdentity is the dedup key for "is this the same physical
// device we already track"; the accessory UUID is the *persisted*
// stable key, derived from the serial number so a device keeps its
// accessory across address changes and process restarts.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use keybridge_api::NetworkLocation;

// ── DeviceIdentity ──────────────────────────────────────────────────

/// Hardware-level identifier (MAC-style) from the discovery TXT record.
///
/// Devices that omit the `id` attribute all collapse onto the empty
/// identity; only one of them ends up tracked. Degenerate input, not
/// handled specially.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DeviceIdentity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceIdentity {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ── DeviceRecord ────────────────────────────────────────────────────

/// The minimal facts needed to address a device, captured at discovery
/// time. Owned by the manager until a session exists, then by the
/// session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub identity: DeviceIdentity,
    pub location: NetworkLocation,
    /// The mDNS service name — the display fallback when the device
    /// reports no name of its own.
    pub friendly_name: String,
}

// ── AccessoryRecord ─────────────────────────────────────────────────

/// The persisted accessory entry the host framework stores across
/// restarts. Never deleted by this subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryRecord {
    pub uuid: Uuid,
    pub device: DeviceRecord,
}

/// Namespace for accessory UUID derivation. Fixed forever: changing it
/// would orphan every persisted accessory.
const ACCESSORY_NAMESPACE: Uuid = Uuid::from_bytes([
    0x8f, 0x2c, 0x1d, 0x6e, 0x5a, 0x41, 0x4b, 0x9c, 0x8d, 0x03, 0x7b, 0x9e, 0x2f, 0x64, 0xa1,
    0xd5,
]);

/// Derive the stable accessory UUID from a device serial number.
///
/// Deterministic and collision-resistant (UUIDv5): re-discovering the
/// same physical device always resolves to the same record, whatever
/// address it shows up under.
pub fn accessory_uuid(serial_number: &str) -> Uuid {
    Uuid::new_v5(&ACCESSORY_NAMESPACE, serial_number.as_bytes())
}
