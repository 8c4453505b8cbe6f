//! Portal core types and utilities

pub mod access;
pub mod errors;
pub mod identity;
pub mod navigation;
pub mod preferences;
pub mod storage;
pub mod types;

pub use errors::{CoreError, CoreResult};
pub use identity::{ClientIdentity, ClientIdentityStore, DeviceInfo, DeviceType};
pub use preferences::Preferences;
pub use storage::{FileStore, KeyValueStore, MemoryStore, TokenStore, keys};
pub use types::{Role, TokenPair, User};
