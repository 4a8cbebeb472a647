//! xivapi client
//!
//! Fetches the current free company member list as mirrored from the
//! Lodestone. This is the authoritative roster for membership, names and
//! ranks.

use roster_common::RemoteMember;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const XIVAPI_BASE_URL: &str = "https://xivapi.com";

/// xivapi client errors
#[derive(Debug, Error)]
pub enum XivApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Free company not found: {0}")]
    FreeCompanyNotFound(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// `/freecompany/{id}?data=FCM` response body (member list only)
#[derive(Debug, Clone, Deserialize)]
struct FreeCompanyResponse {
    #[serde(rename = "FreeCompanyMembers")]
    members: Option<Vec<RemoteMember>>,
}

/// xivapi client
pub struct XivApiClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl XivApiClient {
    pub fn new() -> Result<Self, XivApiError> {
        Self::with_base_url(XIVAPI_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, XivApiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(Duration::from_secs(crate::HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| XivApiError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
        })
    }

    /// Fetch the member list of a free company
    pub async fn fetch_members(
        &self,
        free_company_id: &str,
    ) -> Result<Vec<RemoteMember>, XivApiError> {
        let url = format!(
            "{}/freecompany/{}?data=FCM",
            self.base_url.trim_end_matches('/'),
            free_company_id
        );

        tracing::debug!(free_company_id = %free_company_id, url = %url, "Querying xivapi");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| XivApiError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == 404 {
            return Err(XivApiError::FreeCompanyNotFound(free_company_id.to_string()));
        }

        if status == 429 {
            return Err(XivApiError::RateLimitExceeded);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(XivApiError::ApiError(status.as_u16(), error_text));
        }

        let body: FreeCompanyResponse = response
            .json()
            .await
            .map_err(|e| XivApiError::ParseError(e.to_string()))?;

        let members = body.members.ok_or_else(|| {
            XivApiError::ParseError("response has no FreeCompanyMembers".to_string())
        })?;

        tracing::info!(
            free_company_id = %free_company_id,
            members = members.len(),
            "Retrieved members from xivapi"
        );

        Ok(members)
    }
}
