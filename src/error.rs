//! Error types for the watchdog.

use thiserror::Error;

/// Errors that can occur while observing and re-verifying block imports.
#[derive(Debug, Error)]
pub enum Error {
    /// A payload could not be decoded into a domain object; the affected
    /// verification is skipped, never retried.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The query service does not know the requested root. A normal outcome
    /// for unknown roots, not a transport fault.
    #[error("not found")]
    NotFound,

    /// The query service could not be reached.
    #[error("transport error")]
    Transport(#[from] reqwest::Error),

    /// The event stream connection failed. Fatal to the process only when
    /// the initial connection cannot be established.
    #[error("stream error")]
    Stream(#[from] tokio_tungstenite::tungstenite::Error),

    /// The reference engine rejected the transition. An expected signal from
    /// the engine boundary, not a fault.
    #[error("transition failed: {0}")]
    Transition(String),
}
