//! Authentication API client methods

use super::{ApiClient, ApiRequest, ClientError, LOGIN_PATH, LOGOUT_PATH, PROFILE_PATH};
use crate::types::{LoginRequest, LoginResponse, ProfileResponse, SessionTokenRequest};
use portal_core::User;
use tracing::{debug, info};

impl ApiClient {
    /// Sign in and persist the returned token pair
    ///
    /// A 401 here means bad credentials, so the refresh path is skipped.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let client_id = self.identity.get_client_id()?;
        let request = ApiRequest::post(LOGIN_PATH)
            .json(&LoginRequest {
                email,
                password,
                client_id: &client_id,
            })?
            .without_refresh();

        let response: LoginResponse = self.execute(&request).await?;
        let tokens = response.tokens().ok_or_else(|| {
            ClientError::InvalidResponse("login response did not include tokens".into())
        })?;
        self.tokens.save(&tokens)?;

        info!(user_id = response.user_id(), "Signed in");
        Ok(response)
    }

    /// Fetch the signed-in user's profile
    pub async fn profile(&self) -> Result<User, ClientError> {
        let response: ProfileResponse = self.execute(&ApiRequest::post(PROFILE_PATH)).await?;
        debug!(user_id = %response.data.id, role = %response.data.role, "Loaded profile");
        Ok(response.data)
    }

    /// Revoke the stored refresh token on the backend
    ///
    /// Does nothing without a stored refresh token. Local tokens are left
    /// untouched; clearing them is the session's job.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let Some(refresh_token) = self.tokens.refresh_token()? else {
            debug!("No refresh token stored, skipping logout call");
            return Ok(());
        };
        let client_id = self.identity.get_client_id()?;
        let request = ApiRequest::post(LOGOUT_PATH).json(&SessionTokenRequest {
            refresh_token: &refresh_token,
            client_id: &client_id,
        })?;

        self.execute_empty(&request).await
    }
}
