pub mod config;
pub mod paths;
pub mod session;

pub use config::{Config, LoggingConfig, RemoteConfig};
pub use paths::{PathManager, container_base_path};
pub use session::SessionStore;
