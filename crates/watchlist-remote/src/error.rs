use thiserror::Error;
use watchlist_models::ItemKey;

/// Errors raised by remote collaborators (the hosted table and the session provider).
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Insert hit the (user, external id, kind) unique key.
    #[error("Item {0} already exists in the remote store")]
    DuplicateKey(ItemKey),

    /// Update targeted a row that does not exist.
    #[error("Item {0} not found in the remote store")]
    NotFound(ItemKey),

    /// Non-success HTTP status from the remote store.
    #[error("Remote request failed: {status} - {body}")]
    Http { status: u16, body: String },

    /// Connection, TLS, or timeout failure.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body did not match the expected row shape.
    #[error("Failed to decode remote response: {0}")]
    Decode(String),

    /// Write refused by the store (used by the in-memory repository).
    #[error("Remote store rejected the write: {0}")]
    Rejected(String),

    /// No remote store is configured for this installation.
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// Session could not be resolved.
    #[error("Session error: {0}")]
    Session(String),
}

pub type Result<T> = std::result::Result<T, RemoteError>;
