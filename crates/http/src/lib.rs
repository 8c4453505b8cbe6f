//! Portal HTTP client
//!
//! Talks to the dashboard REST API. Every request carries the persisted bearer
//! token; expired tokens are refreshed transparently, with a single refresh in
//! flight per client and concurrent callers queued behind it.

pub mod client;
pub mod types;

pub use client::{
    ApiClient, ApiClientBuilder, ApiRequest,
    config::ClientConfig,
    error::{ClientError, RefreshFailure},
    events::{AuthEvent, AuthEvents},
};
