use thiserror::Error;
use watchlist_models::ItemKey;
use watchlist_remote::RemoteError;

/// Errors from the local key-value backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Hard failures of coordinator operations. Soft failures are reported through
/// [`crate::sync::SyncOutcome::Skipped`] instead.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote step of a write-through failed; the local cache was not touched.
    #[error("Remote write failed during {operation} for {key}: {source}")]
    RemoteWriteFailed {
        operation: &'static str,
        key: ItemKey,
        #[source]
        source: RemoteError,
    },

    /// Hydration could not list the remote collection; the local cache was not touched.
    #[error("Remote read failed: {0}")]
    RemoteReadFailed(#[source] RemoteError),
}

/// Reasons the bootstrap sequence fell back to forcing the init gate open.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Failed to resolve session: {0}")]
    Session(#[from] RemoteError),

    #[error("Failed to hydrate local cache: {0}")]
    Hydrate(#[from] SyncError),
}
