// keybridge-api: Async Rust client for the Elgato Key Light control API

pub mod client;
pub mod error;
pub mod models;

pub use client::LightClient;
pub use error::Error;
pub use models::{
    DeviceInfo, DeviceOptions, DeviceSettings, LightProperty, LightState, MAX_TEMPERATURE,
    MIN_TEMPERATURE, NetworkLocation,
};
