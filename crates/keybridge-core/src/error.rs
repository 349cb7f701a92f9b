// ── Core error types ──
//
// Hydration failure is the one error with its own meaning here: it is
// fatal to a device's onboarding and the device stays untracked until
// the next discovery broadcast. Everything after hydration is either
// recovered locally (poll and settings paths) or passed through to the
// presentation side as a failed write.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The initial info/options/settings fetch failed. No session exists
    /// for the device and none will be retried.
    #[error("hydration of '{name}' failed: {source}")]
    Hydration {
        name: String,
        #[source]
        source: keybridge_api::Error,
    },

    /// A request to an already-hydrated device failed.
    #[error("device request failed: {0}")]
    Device(#[from] keybridge_api::Error),
}

impl CoreError {
    /// Wrap an api error as a hydration failure for the named device.
    pub(crate) fn hydration(name: impl Into<String>, source: keybridge_api::Error) -> Self {
        Self::Hydration {
            name: name.into(),
            source,
        }
    }
}
