// ── Discovery input ──
//
// The mDNS transport itself is an external collaborator; it browses for
// the `elg` service type and feeds these events into
// `DeviceManager::run`. Only derivation logic lives here.

use std::collections::HashMap;

use keybridge_api::NetworkLocation;

use crate::model::DeviceIdentity;

/// mDNS service type Key Lights announce under.
pub const SERVICE_TYPE: &str = "elg";

/// One service advertisement seen on the local network.
#[derive(Debug, Clone)]
pub struct DiscoveryEvent {
    /// Advertised service name, used as the friendly display fallback.
    pub name: String,
    /// Advertised hostname.
    pub host: String,
    /// Candidate addresses, most preferred first.
    pub addresses: Vec<String>,
    pub port: u16,
    /// TXT attribute map; `id` carries the hardware identity.
    pub txt: HashMap<String, String>,
}

impl DiscoveryEvent {
    /// The hardware identity, or the empty identity when the `id`
    /// attribute is missing.
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::from(self.txt.get("id").cloned().unwrap_or_default())
    }

    /// The network location this advertisement points at.
    ///
    /// With `use_ip` the first candidate address wins (falling back to
    /// the hostname when the advertisement carried none).
    pub fn location(&self, use_ip: bool) -> NetworkLocation {
        let host = if use_ip {
            self.addresses
                .first()
                .cloned()
                .unwrap_or_else(|| self.host.clone())
        } else {
            self.host.clone()
        };
        NetworkLocation::new(host, self.port)
    }
}
