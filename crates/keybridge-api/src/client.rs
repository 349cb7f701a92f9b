// Key Light HTTP client
//
// Wraps `reqwest::Client` with the device's URL layout and response
// decoding. The network location is interior-mutable: discovery hands
// out new addresses over time and subsequent requests must follow,
// while an in-flight request keeps the URL it started with.

use std::sync::RwLock;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{DeviceInfo, DeviceOptions, DeviceSettings, LightProperty, NetworkLocation};

/// Raw HTTP client for one Key Light's REST control surface.
///
/// All five operations live under `http://{host}:{port}/elgato/`. Every
/// method fails with [`Error`] on network trouble, timeout, a non-2xx
/// status, or an unexpected body — and for no other reason.
pub struct LightClient {
    http: reqwest::Client,
    location: RwLock<NetworkLocation>,
}

impl LightClient {
    /// Create a client for the given location.
    ///
    /// `timeout` applies to every request; callers pass the poll
    /// interval so a hung device can never stall a cycle past its slot.
    pub fn new(location: NetworkLocation, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            location: RwLock::new(location),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, location: NetworkLocation) -> Self {
        Self {
            http,
            location: RwLock::new(location),
        }
    }

    /// The location requests are currently sent to.
    pub fn location(&self) -> NetworkLocation {
        self.location.read().expect("location lock poisoned").clone()
    }

    /// Point subsequent requests at a new host/port.
    ///
    /// Requests already in flight complete (or fail) against the old
    /// location.
    pub fn set_location(&self, location: NetworkLocation) {
        debug!(%location, "updating device location");
        *self.location.write().expect("location lock poisoned") = location;
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `http://{host}:{port}/elgato/{path}` from the current location.
    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let location = self.location.read().expect("location lock poisoned");
        let full = format!("http://{}:{}/elgato/{path}", location.host, location.port);
        Ok(Url::parse(&full)?)
    }

    // ── Operations ──────────────────────────────────────────────────

    /// `GET accessory-info` — static device facts.
    pub async fn get_info(&self) -> Result<DeviceInfo, Error> {
        self.get_json(self.endpoint("accessory-info")?).await
    }

    /// `GET lights` — live light state.
    pub async fn get_options(&self) -> Result<DeviceOptions, Error> {
        self.get_json(self.endpoint("lights")?).await
    }

    /// `GET lights/settings` — power-on behavior and durations.
    pub async fn get_settings(&self) -> Result<DeviceSettings, Error> {
        self.get_json(self.endpoint("lights/settings")?).await
    }

    /// `PUT lights` with `{"lights":[{"<property>":<value>}]}`.
    ///
    /// Writes a single property of the first light element.
    pub async fn set_option(&self, property: LightProperty, value: u16) -> Result<(), Error> {
        let mut light = serde_json::Map::new();
        light.insert(property.as_str().to_owned(), value.into());
        let body = json!({ "lights": [light] });
        self.put(self.endpoint("lights")?, &body).await
    }

    /// `PUT lights/settings` — replace the full settings block.
    pub async fn put_settings(&self, settings: &DeviceSettings) -> Result<(), Error> {
        self.put(self.endpoint("lights/settings")?, settings).await
    }

    /// `POST identify` — make the light blink so the user can spot it.
    pub async fn identify(&self) -> Result<(), Error> {
        let url = self.endpoint("identify")?;
        debug!("POST {url}");
        let resp = self.http.post(url).send().await?;
        Self::check_status(&resp)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {url}");
        let resp = self.http.get(url).send().await?;
        Self::check_status(&resp)?;

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }

    /// Send a PUT request with a JSON body, ignoring the response body.
    async fn put(&self, url: Url, body: &(impl Serialize + Sync)) -> Result<(), Error> {
        debug!("PUT {url}");
        let resp = self.http.put(url).json(body).send().await?;
        Self::check_status(&resp)
    }

    fn check_status(resp: &reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Http {
                status: status.as_u16(),
            })
        }
    }
}
