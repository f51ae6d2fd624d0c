use thiserror::Error;

/// Errors crossing the alert engine's port boundaries.
///
/// Per-event and per-publish failures are contained by the caller (logged,
/// never fatal); only startup-time connect/load errors abort the process.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    #[error("publish failed: {0}")]
    PublishFailed(String),

    #[error("subscribe failed: {0}")]
    SubscribeFailed(String),

    #[error("state store write failed: {0}")]
    StoreFailed(String),

    #[error("state store read failed: {0}")]
    LoadFailed(String),

    #[error("malformed alert event: {0}")]
    MalformedEvent(String),

    #[error("invalid SLA tier {0}: expected 0, 1 or 2")]
    InvalidTier(u8),
}
