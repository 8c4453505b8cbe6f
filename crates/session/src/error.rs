//! Session error types

use crate::form::ValidationError;
use portal_core::CoreError;
use portal_http::ClientError;
use thiserror::Error;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The login form failed client-side checks
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Storage(#[from] CoreError),
}

impl SessionError {
    /// Message to show next to the login form
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Client(ClientError::AuthenticationFailed(_)) => {
                "Invalid email or password. Please try again.".to_string()
            }
            Self::Client(
                ClientError::BadRequest(message)
                | ClientError::Forbidden(message)
                | ClientError::NotFound(message)
                | ClientError::ServerError { message, .. },
            ) if !message.is_empty() => message.clone(),
            Self::Client(e) => e.to_string(),
            Self::Storage(_) => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }
}
