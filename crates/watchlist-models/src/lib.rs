pub mod collection;
pub mod identity;
pub mod media;
pub mod status;
pub mod watchlist;

pub use collection::Collection;
pub use identity::Identity;
pub use media::{Media, MediaKind, Progress};
pub use status::WatchStatus;
pub use watchlist::{ItemKey, ItemPatch, WatchItem};
