pub mod error;
pub mod memory;
pub mod offline;
pub mod rest;
pub mod session;
pub mod subscription;
pub mod traits;

pub use error::RemoteError;
pub use memory::{MemoryRepository, MemorySession};
pub use offline::OfflineRepository;
pub use rest::RestRepository;
pub use session::StoredSession;
pub use subscription::{Observers, Subscription};
pub use traits::{IdentityCallback, RemoteMediaRepository, SessionOracle};
