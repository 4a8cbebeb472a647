//! Google Sheets values client
//!
//! Reads a cell range from the officer-maintained roster spreadsheet.
//! Rows come back as formatted strings; the API omits trailing empty cells,
//! so rows may be shorter than the range width.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

/// Sheets client errors
#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Access token rejected (HTTP {0})")]
    Unauthorized(u16),

    #[error("Spreadsheet or range not found: {0}")]
    NotFound(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// `spreadsheets.values.get` response body
#[derive(Debug, Clone, Deserialize)]
pub struct ValueRange {
    #[serde(default)]
    pub range: Option<String>,
    #[serde(rename = "majorDimension", default)]
    pub major_dimension: Option<String>,
    /// Absent when the range holds no data
    #[serde(default)]
    pub values: Vec<Vec<String>>,
}

/// Google Sheets API client
pub struct SheetsClient {
    http_client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl SheetsClient {
    pub fn new(access_token: impl Into<String>) -> Result<Self, SheetsError> {
        Self::with_base_url(SHEETS_BASE_URL, access_token)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, SheetsError> {
        let http_client = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(Duration::from_secs(crate::HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| SheetsError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            access_token: access_token.into(),
        })
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<reqwest::Url, SheetsError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| SheetsError::NetworkError(format!("invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| {
                SheetsError::NetworkError(format!(
                    "base URL cannot hold a path: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", spreadsheet_id, "values", range]);
        Ok(url)
    }

    /// Fetch all rows in `range` (A1 notation, e.g. `Members!A2:I`)
    pub async fn fetch_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError> {
        let url = self.values_url(spreadsheet_id, range)?;

        tracing::debug!(url = %url, "Querying Google Sheets API");

        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| SheetsError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == 401 || status == 403 {
            return Err(SheetsError::Unauthorized(status.as_u16()));
        }

        if status == 404 {
            return Err(SheetsError::NotFound(format!("{} / {}", spreadsheet_id, range)));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SheetsError::ApiError(status.as_u16(), error_text));
        }

        let value_range: ValueRange = response
            .json()
            .await
            .map_err(|e| SheetsError::ParseError(e.to_string()))?;

        tracing::info!(
            range = %value_range.range.as_deref().unwrap_or(range),
            rows = value_range.values.len(),
            "Retrieved members from spreadsheet"
        );

        Ok(value_range.values)
    }
}
