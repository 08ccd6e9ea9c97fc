use serde::Serialize;
use thiserror::Error;

/// Classified outcome of a failed catalog refresh.
///
/// This is the only vocabulary callers may branch on; raw transport errors
/// never leave the sync layer.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum SyncError {
    /// No connectivity or a transport-level failure (DNS, socket, timeout).
    #[error("Network unavailable")]
    Network,

    /// The remote answered with a non-success status code.
    #[error("Remote returned status {0}")]
    Api(u16),

    /// Anything else, e.g. an unparseable payload.
    #[error("Unexpected sync failure: {0}")]
    Unknown(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ModerationError {
    #[error("Failed to load moderation data: {0}")]
    Fetch(String),

    #[error("Atomic commit failed: {0}")]
    Commit(String),

    #[error("Report update failed: {0}")]
    Update(String),

    #[error("No signed-in user")]
    NotSignedIn,
}
