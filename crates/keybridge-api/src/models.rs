// ── Key Light wire model ──
//
// Shapes exactly as the device's REST surface reports them. Field names
// on the wire are camelCase for info/settings and bare lowercase for the
// per-light state, hence the mixed rename attributes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest color temperature the device accepts, in its own units.
pub const MIN_TEMPERATURE: u16 = 143;
/// Highest color temperature the device accepts, in its own units.
pub const MAX_TEMPERATURE: u16 = 344;

// ── NetworkLocation ─────────────────────────────────────────────────

/// Where a device currently lives on the network.
///
/// Mutable by design: lights re-announce themselves after DHCP lease
/// changes, and the location is then replaced in place while the
/// device identity stays the same.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkLocation {
    pub host: String,
    pub port: u16,
}

impl NetworkLocation {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for NetworkLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ── DeviceInfo ──────────────────────────────────────────────────────

/// Static device facts from `GET accessory-info`.
///
/// Read once during hydration and never refreshed — the serial number in
/// here is the basis for the stable accessory identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub product_name: String,
    pub hardware_board_type: u32,
    pub firmware_build_number: u32,
    pub firmware_version: String,
    pub serial_number: String,
    /// User-assigned name; may be empty, in which case the discovery
    /// service name is the better label.
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub features: Vec<String>,
}

// ── DeviceSettings ──────────────────────────────────────────────────

/// Power-on behavior and transition durations from `GET lights/settings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSettings {
    pub power_on_behavior: u32,
    pub power_on_brightness: u32,
    pub power_on_temperature: u32,
    pub switch_on_duration_ms: u32,
    pub switch_off_duration_ms: u32,
    pub color_change_duration_ms: u32,
}

impl Default for DeviceSettings {
    /// Factory values, used when neither the embedder's configuration
    /// nor the device supplies a field.
    fn default() -> Self {
        Self {
            power_on_behavior: 1,
            power_on_brightness: 20,
            power_on_temperature: 213,
            switch_on_duration_ms: 100,
            switch_off_duration_ms: 300,
            color_change_duration_ms: 100,
        }
    }
}

// ── DeviceOptions ───────────────────────────────────────────────────

/// Mutable state of a single light element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightState {
    pub on: u16,
    pub brightness: u16,
    pub temperature: u16,
}

impl LightState {
    /// Read one field by property name.
    pub fn get(&self, property: LightProperty) -> u16 {
        match property {
            LightProperty::On => self.on,
            LightProperty::Brightness => self.brightness,
            LightProperty::Temperature => self.temperature,
        }
    }
}

/// Live light state from `GET lights`.
///
/// Multi-element fixtures report more than one entry, but only the first
/// light is ever read or written — the rest mirror it on the device side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceOptions {
    pub number_of_lights: u32,
    pub lights: Vec<LightState>,
}

impl DeviceOptions {
    /// The one controllable light element.
    pub fn first_light(&self) -> Option<&LightState> {
        self.lights.first()
    }
}

// ── LightProperty ───────────────────────────────────────────────────

/// The three writable per-light properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightProperty {
    On,
    Brightness,
    Temperature,
}

impl LightProperty {
    /// The property's wire name, as used in `PUT lights` bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Brightness => "brightness",
            Self::Temperature => "temperature",
        }
    }
}

impl fmt::Display for LightProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
