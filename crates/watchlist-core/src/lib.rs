pub mod bootstrap;
pub mod context;
pub mod error;
pub mod local_store;
pub mod migration;
pub mod sync;

pub use bootstrap::{BootstrapSequencer, IdentityTransition, InitGate, InitState};
pub use context::AppContext;
pub use error::{BootstrapError, StoreError, SyncError};
pub use local_store::{FileKeyValueStore, KeyValueStore, LocalCacheStore, MemoryKeyValueStore, MigrationFlags};
pub use migration::{MigrationDecision, MigrationPrompt, MigrationProtocol};
pub use sync::{HydrateOutcome, SoftFailure, SyncCoordinator, SyncOutcome};
