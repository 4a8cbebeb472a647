//! OAuth2 authorization for the Google Sheets API
//!
//! Installed-application flow with a file token store:
//! 1. A stored, unexpired access token is used as-is
//! 2. An expired token with a refresh token is refreshed and re-stored
//! 3. Otherwise the user opens the authorization URL, pastes the returned
//!    code, and the code is exchanged for a token which is then stored
//!
//! The token file is written atomically (temp file + rename) and restricted
//! to the owner on Unix.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Read-only access to spreadsheets
pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

/// Token store key; the tool only ever authorizes one user
pub const DEFAULT_USER_ID: &str = "default";

/// Tokens this close to expiry are treated as expired
const EXPIRY_MARGIN_SECS: i64 = 60;

/// OAuth errors
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Credentials file error: {0}")]
    Credentials(String),

    #[error("Token store error: {0}")]
    TokenStore(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Token endpoint error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("No authorization code entered")]
    MissingCode,
}

/// OAuth client secrets as downloaded from the Google Cloud console
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// credentials.json wraps the secrets in an `installed` or `web` object
#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn from_json_str(content: &str) -> Result<Self, OAuthError> {
        let file: ClientSecretsFile =
            serde_json::from_str(content).map_err(|e| OAuthError::Credentials(e.to_string()))?;
        file.installed.or(file.web).ok_or_else(|| {
            OAuthError::Credentials("expected an \"installed\" or \"web\" section".to_string())
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, OAuthError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            OAuthError::Credentials(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }
}

/// A persisted access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// `None` means the token does not expire
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl StoredToken {
    /// True if the token can still be used at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - ChronoDuration::seconds(EXPIRY_MARGIN_SECS) > now,
            None => true,
        }
    }
}

/// File-backed token store, one entry per user id
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, StoredToken>, OAuthError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| OAuthError::TokenStore(format!("read {}: {}", self.path.display(), e)))?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| OAuthError::TokenStore(format!("parse {}: {}", self.path.display(), e)))
    }

    /// Load the token for `user_id`, if any
    pub fn load(&self, user_id: &str) -> Result<Option<StoredToken>, OAuthError> {
        Ok(self.read_all()?.remove(user_id))
    }

    /// Store the token for `user_id`, keeping other users' entries
    pub fn store(&self, user_id: &str, token: &StoredToken) -> Result<(), OAuthError> {
        let mut tokens = self.read_all()?;
        tokens.insert(user_id.to_string(), token.clone());
        let content = serde_json::to_string_pretty(&tokens)
            .map_err(|e| OAuthError::TokenStore(e.to_string()))?;
        write_atomic(&self.path, content.as_bytes())
            .map_err(|e| OAuthError::TokenStore(format!("write {}: {}", self.path.display(), e)))
    }
}

/// Write `contents` to a sibling temp file, then rename it over `path`
fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "token".to_string());
    let temp_path = path.with_file_name(format!("{}.tmp", file_name));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = create_private(&temp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&temp_path, path)
}

/// Create `path` fresh, owner read/write only from the moment it exists
///
/// A leftover file at `path` is removed first; its permissions would
/// otherwise survive the open.
fn create_private(path: &Path) -> std::io::Result<File> {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn into_stored(self, now: DateTime<Utc>, previous_refresh: Option<String>) -> StoredToken {
        StoredToken {
            access_token: self.access_token,
            // Refresh responses usually omit the refresh token
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: self.expires_in.map(|secs| now + ChronoDuration::seconds(secs)),
            scope: self.scope,
        }
    }
}

/// Installed-app OAuth2 authorizer
pub struct Authorizer {
    http_client: reqwest::Client,
    secrets: ClientSecrets,
    store: FileTokenStore,
    scope: String,
    redirect_uri: String,
}

impl Authorizer {
    pub fn new(
        secrets: ClientSecrets,
        store: FileTokenStore,
        redirect_uri: impl Into<String>,
    ) -> Result<Self, OAuthError> {
        let http_client = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(Duration::from_secs(crate::HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| OAuthError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            secrets,
            store,
            scope: SHEETS_READONLY_SCOPE.to_string(),
            redirect_uri: redirect_uri.into(),
        })
    }

    /// URL the user must open to grant access
    pub fn authorization_url(&self) -> Result<String, OAuthError> {
        let url = reqwest::Url::parse_with_params(
            &self.secrets.auth_uri,
            &[
                ("client_id", self.secrets.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", self.scope.as_str()),
                ("access_type", "offline"),
            ],
        )
        .map_err(|e| OAuthError::Credentials(format!("invalid auth_uri: {}", e)))?;
        Ok(url.to_string())
    }

    /// Stored credentials, refreshed if stale
    ///
    /// Returns `None` when no usable token exists and the user must
    /// authorize interactively.
    pub async fn stored_credentials(&self) -> Result<Option<StoredToken>, OAuthError> {
        let Some(token) = self.store.load(DEFAULT_USER_ID)? else {
            tracing::debug!("No stored OAuth token");
            return Ok(None);
        };

        if token.is_fresh(Utc::now()) {
            tracing::debug!("Using stored OAuth token");
            return Ok(Some(token));
        }

        match token.refresh_token.clone() {
            Some(refresh_token) => {
                tracing::info!("Stored OAuth token expired, refreshing");
                let refreshed = self.refresh(&refresh_token).await?;
                Ok(Some(refreshed))
            }
            None => {
                tracing::warn!("Stored OAuth token expired and has no refresh token");
                Ok(None)
            }
        }
    }

    /// Exchange a refresh token for a new access token and store it
    pub async fn refresh(&self, refresh_token: &str) -> Result<StoredToken, OAuthError> {
        let params = [
            ("client_id", self.secrets.client_id.as_str()),
            ("client_secret", self.secrets.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = self.request_token(&params).await?;
        let token = response.into_stored(Utc::now(), Some(refresh_token.to_string()));
        self.store.store(DEFAULT_USER_ID, &token)?;
        Ok(token)
    }

    /// Exchange an authorization code for a token and store it
    pub async fn exchange_code(&self, code: &str) -> Result<StoredToken, OAuthError> {
        let params = [
            ("client_id", self.secrets.client_id.as_str()),
            ("client_secret", self.secrets.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let response = self.request_token(&params).await?;
        let token = response.into_stored(Utc::now(), None);
        self.store.store(DEFAULT_USER_ID, &token)?;
        tracing::info!("Stored OAuth token in {}", self.store.path().display());
        Ok(token)
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<TokenResponse, OAuthError> {
        tracing::debug!(url = %self.secrets.token_uri, "Requesting OAuth token");

        let response = self
            .http_client
            .post(&self.secrets.token_uri)
            .form(params)
            .send()
            .await
            .map_err(|e| OAuthError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OAuthError::ApiError(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| OAuthError::ParseError(e.to_string()))
    }

    /// Ensure a usable access token, prompting the user if necessary
    ///
    /// `prompt` receives the authorization URL and returns the code the
    /// user pasted back.
    pub async fn authorize<F>(&self, prompt: F) -> Result<String, OAuthError>
    where
        F: FnOnce(&str) -> std::io::Result<String>,
    {
        if let Some(token) = self.stored_credentials().await? {
            return Ok(token.access_token);
        }

        let url = self.authorization_url()?;
        let code = prompt(&url).map_err(|e| OAuthError::Credentials(e.to_string()))?;
        let code = code.trim();
        if code.is_empty() {
            return Err(OAuthError::MissingCode);
        }

        let token = self.exchange_code(code).await?;
        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn secrets() -> ClientSecrets {
        ClientSecrets {
            client_id: "client-123.apps.googleusercontent.com".to_string(),
            client_secret: "s3cret".to_string(),
            auth_uri: default_auth_uri(),
            token_uri: default_token_uri(),
        }
    }

    #[test]
    fn test_client_secrets_installed_section() {
        let json = r#"{"installed":{"client_id":"abc","client_secret":"xyz",
            "auth_uri":"https://accounts.google.com/o/oauth2/auth",
            "token_uri":"https://oauth2.googleapis.com/token",
            "redirect_uris":["urn:ietf:wg:oauth:2.0:oob","http://localhost"]}}"#;
        let secrets = ClientSecrets::from_json_str(json).unwrap();
        assert_eq!(secrets.client_id, "abc");
        assert_eq!(secrets.client_secret, "xyz");
    }

    #[test]
    fn test_client_secrets_web_section_and_defaults() {
        let json = r#"{"web":{"client_id":"abc","client_secret":"xyz"}}"#;
        let secrets = ClientSecrets::from_json_str(json).unwrap();
        assert_eq!(secrets.token_uri, default_token_uri());
    }

    #[test]
    fn test_client_secrets_missing_section() {
        assert!(matches!(
            ClientSecrets::from_json_str(r#"{"other":{}}"#),
            Err(OAuthError::Credentials(_))
        ));
    }

    #[test]
    fn test_token_freshness() {
        let now = Utc::now();
        let mut token = StoredToken {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at: Some(now + ChronoDuration::seconds(3600)),
            scope: None,
        };
        assert!(token.is_fresh(now));

        token.expires_at = Some(now + ChronoDuration::seconds(30));
        assert!(!token.is_fresh(now));

        token.expires_at = None;
        assert!(token.is_fresh(now));
    }

    #[test]
    fn test_token_store_round_trip_keeps_other_users() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(temp_dir.path().join("token.json"));
        assert_eq!(store.load(DEFAULT_USER_ID).unwrap(), None);

        let token = StoredToken {
            access_token: "a".to_string(),
            refresh_token: Some("r".to_string()),
            expires_at: None,
            scope: Some(SHEETS_READONLY_SCOPE.to_string()),
        };
        store.store("other", &token).unwrap();
        store.store(DEFAULT_USER_ID, &token).unwrap();

        assert_eq!(store.load(DEFAULT_USER_ID).unwrap(), Some(token.clone()));
        assert_eq!(store.load("other").unwrap(), Some(token));
        assert!(!temp_dir.path().join("token.json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_token_store_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token.json");
        let store = FileTokenStore::new(&path);
        let token = StoredToken {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at: None,
            scope: None,
        };
        store.store(DEFAULT_USER_ID, &token).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_temp_token_file_is_private_on_creation() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let temp_path = temp_dir.path().join("token.json.tmp");
        std::fs::write(&temp_path, "stale").unwrap();
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let file = create_private(&temp_path).unwrap();
        let mode = file.metadata().unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(file.metadata().unwrap().len(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_store_replaces_stale_temp_file() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token.json");
        std::fs::write(temp_dir.path().join("token.json.tmp"), "stale").unwrap();

        let store = FileTokenStore::new(&path);
        let token = StoredToken {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at: None,
            scope: None,
        };
        store.store(DEFAULT_USER_ID, &token).unwrap();

        assert!(!temp_dir.path().join("token.json.tmp").exists());
        assert_eq!(store.load(DEFAULT_USER_ID).unwrap(), Some(token));
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_authorization_url_params() {
        let temp_dir = TempDir::new().unwrap();
        let authorizer = Authorizer::new(
            secrets(),
            FileTokenStore::new(temp_dir.path().join("token.json")),
            "urn:ietf:wg:oauth:2.0:oob",
        )
        .unwrap();

        let url = reqwest::Url::parse(&authorizer.authorization_url().unwrap()).unwrap();
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "client-123.apps.googleusercontent.com");
        assert_eq!(params["redirect_uri"], "urn:ietf:wg:oauth:2.0:oob");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["scope"], SHEETS_READONLY_SCOPE);
    }

    #[test]
    fn test_refresh_response_keeps_previous_refresh_token() {
        let now = Utc::now();
        let response = TokenResponse {
            access_token: "new".to_string(),
            expires_in: Some(3599),
            refresh_token: None,
            scope: None,
        };
        let token = response.into_stored(now, Some("keep-me".to_string()));
        assert_eq!(token.refresh_token.as_deref(), Some("keep-me"));
        assert_eq!(token.expires_at, Some(now + ChronoDuration::seconds(3599)));
    }
}
