//! Portal session layer
//!
//! Holds the signed-in user, restores it from persisted tokens, and decides
//! which dashboard routes the user may enter.

pub mod error;
pub mod form;
pub mod guard;
pub mod store;

pub use error::{SessionError, SessionResult};
pub use form::{LoginForm, ValidationError};
pub use guard::{
    GuardDecision, Redirect, RoleGate, RoleRedirect, RouteAccess, evaluate, require_auth,
};
pub use store::{Session, SessionStore};
