use thiserror::Error;

/// Top-level error type for the `keybridge-api` crate.
///
/// Every client operation fails with one of these and nothing else:
/// transport problems (connection refused, DNS, timeout), a non-2xx
/// response, or a body that does not match the expected shape.
/// `keybridge-core` decides what each failure means for the device.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL construction error (bad host reported by discovery).
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Protocol ────────────────────────────────────────────────────
    /// The device answered with a non-2xx status.
    #[error("Device returned HTTP {status}")]
    Http { status: u16 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }

    /// Returns `true` if the device could not be reached at all
    /// (as opposed to answering with an error).
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_connect())
    }
}
