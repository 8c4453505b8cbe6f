//! Request and response bodies of the dashboard API

use portal_core::{TokenPair, User};
use serde::{Deserialize, Serialize};

/// Login request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub client_id: &'a str,
}

/// Body shared by the logout and refresh-token endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokenRequest<'a> {
    pub refresh_token: &'a str,
    pub client_id: &'a str,
}

/// Login response
///
/// Deployed backends nest the token pair inside `data`, older ones put it
/// next to `data`; both shapes are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub data: LoginData,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user: LoginUser,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// The login endpoint only reports the user id; the profile call fills in the rest
#[derive(Debug, Clone, Deserialize)]
pub struct LoginUser {
    #[serde(rename = "_id")]
    pub id: String,
}

impl LoginResponse {
    pub fn user_id(&self) -> &str {
        &self.data.user.id
    }

    /// Token pair from whichever location the backend used
    pub fn tokens(&self) -> Option<TokenPair> {
        let access = self.data.access_token.as_ref().or(self.access_token.as_ref())?;
        let refresh = self
            .data
            .refresh_token
            .as_ref()
            .or(self.refresh_token.as_ref())?;
        Some(TokenPair::new(access.clone(), refresh.clone()))
    }
}

/// Profile response
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResponse {
    pub data: User,
}

/// Refresh-token response
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub token: TokenPair,
}

/// Role requested in an upgrade request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeRole {
    User,
    Franchise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeStatus {
    Pending,
    Approved,
    Rejected,
}

/// Role upgrade request awaiting admin review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRequest {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub phone: String,
    pub email: String,
    pub fullname: String,
    pub role: UpgradeRole,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub franchise_name: Option<String>,
    pub status: UpgradeStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpgradeRequestsResponse {
    pub requests: Vec<UpgradeRequest>,
}

/// Error body returned by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
}
