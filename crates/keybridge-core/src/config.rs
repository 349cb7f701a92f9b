// ── Runtime bridge configuration ──
//
// Describes *how* the bridge tracks lights: poll cadence, address
// preference, and optional power-on overrides pushed to every device
// right after hydration. The embedding application constructs one and
// hands it in; nothing here touches disk.

use std::time::Duration;

use keybridge_api::DeviceSettings;

/// Bridge-wide configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address a device by its first discovered IP instead of the
    /// advertised hostname. Helps on networks with flaky mDNS name
    /// resolution.
    pub use_ip: bool,

    /// Poll interval for each device session. Doubles as the HTTP
    /// request timeout, so one cycle can never outlive its slot.
    pub polling_rate: Duration,

    // Optional per-field overrides for the device's power-on settings.
    // `None` keeps whatever the device currently reports.
    pub power_on_behavior: Option<u32>,
    pub power_on_brightness: Option<u32>,
    /// Power-on color temperature in Kelvin (converted to device units).
    pub power_on_temperature: Option<u32>,
    pub switch_on_duration_ms: Option<u32>,
    pub switch_off_duration_ms: Option<u32>,
    pub color_change_duration_ms: Option<u32>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            use_ip: false,
            polling_rate: Duration::from_millis(1000),
            power_on_behavior: None,
            power_on_brightness: None,
            power_on_temperature: None,
            switch_on_duration_ms: None,
            switch_off_duration_ms: None,
            color_change_duration_ms: None,
        }
    }
}

impl BridgeConfig {
    /// Resolve the settings to push to a freshly hydrated device.
    ///
    /// Per field: configured override wins, else the device's current
    /// value stands. Devices always report a full settings block after
    /// hydration, so [`DeviceSettings::default`] only backs the
    /// degenerate no-current case upstream.
    pub fn desired_settings(&self, current: &DeviceSettings) -> DeviceSettings {
        DeviceSettings {
            power_on_behavior: self.power_on_behavior.unwrap_or(current.power_on_behavior),
            power_on_brightness: self
                .power_on_brightness
                .unwrap_or(current.power_on_brightness),
            power_on_temperature: self
                .power_on_temperature
                .map_or(current.power_on_temperature, kelvin_to_device_units),
            switch_on_duration_ms: self
                .switch_on_duration_ms
                .unwrap_or(current.switch_on_duration_ms),
            switch_off_duration_ms: self
                .switch_off_duration_ms
                .unwrap_or(current.switch_off_duration_ms),
            color_change_duration_ms: self
                .color_change_duration_ms
                .unwrap_or(current.color_change_duration_ms),
        }
    }
}

/// Convert Kelvin to the device's reciprocal temperature units,
/// rounding to nearest.
fn kelvin_to_device_units(kelvin: u32) -> u32 {
    (1_000_000 + kelvin / 2) / kelvin.max(1)
}
