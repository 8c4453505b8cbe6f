//! Upgrade request client methods

use super::{ApiClient, ApiRequest, ClientError, PENDING_REQUESTS_PATH};
use crate::types::{UpgradeRequest, UpgradeRequestsResponse};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

impl ApiClient {
    /// List role upgrade requests awaiting review
    pub async fn list_pending_upgrade_requests(
        &self,
        page: u32,
        limit: u32,
    ) -> Result<Vec<UpgradeRequest>, ClientError> {
        let request = ApiRequest::get(PENDING_REQUESTS_PATH)
            .query("page", page)
            .query("limit", limit);
        let response: UpgradeRequestsResponse = self.execute(&request).await?;
        Ok(response.requests)
    }
}
