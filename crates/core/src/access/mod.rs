pub mod permissions;

pub use permissions::{Access, Permission, permissions_for};
