use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;
use url::Url;

use crate::{Result, SheetsError};

// ─── Constants ────────────────────────────────────────────────────────────

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const CREDENTIALS_FILE: &str = "credentials.json";
const TOKEN_FILE: &str = "token.json";

/// Out-of-band redirect for installed apps without a local listener; the
/// consent page shows the code for the user to copy.
const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Tokens are treated as expired this long before they actually are, so a
/// token cannot lapse mid-run.
const EXPIRY_MARGIN_MINUTES: i64 = 5;

// ─── Client secrets ───────────────────────────────────────────────────────

/// The `installed` section of a downloaded OAuth client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SecretsFile {
    installed: ClientSecrets,
}

fn redirect_uri(secrets: &ClientSecrets) -> &str {
    secrets
        .redirect_uris
        .first()
        .map_or(OOB_REDIRECT_URI, String::as_str)
}

// ─── Stored token ─────────────────────────────────────────────────────────

/// Access token cached in `token.json` between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expiry: DateTime<Utc>,
}

impl StoredToken {
    fn is_fresh(&self) -> bool {
        Utc::now() + Duration::minutes(EXPIRY_MARGIN_MINUTES) < self.expiry
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

// ─── Authenticator ────────────────────────────────────────────────────────

/// Loads or obtains Sheets credentials from an auth directory holding
/// `credentials.json` (the downloaded OAuth client) and `token.json` (the
/// cached token from an earlier run).
pub struct Authenticator {
    auth_dir: PathBuf,
    http: Client,
}

impl Authenticator {
    pub fn new(auth_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            auth_dir: auth_dir.into(),
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
        })
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.auth_dir.join(CREDENTIALS_FILE)
    }

    pub fn token_path(&self) -> PathBuf {
        self.auth_dir.join(TOKEN_FILE)
    }

    /// Produce a usable access token.
    ///
    /// A fresh cached token is returned as is; an expired one with a refresh
    /// token is refreshed. Otherwise `consent` is called with the consent
    /// URL and must return what the user pasted back (the full redirect URL
    /// or the bare authorization code), which is then exchanged. Whatever
    /// path ran, the resulting token is persisted for the next run.
    pub fn obtain_token<F>(&self, consent: F) -> Result<StoredToken>
    where
        F: FnOnce(&str) -> Result<String>,
    {
        if !self.auth_dir.exists() {
            info!("creating auth dir '{}'", self.auth_dir.display());
            fs::create_dir_all(&self.auth_dir)?;
        }
        let secrets = self.load_secrets()?;

        if let Some(token) = self.load_token() {
            if token.is_fresh() {
                return Ok(token);
            }
            if let Some(refresh) = token.refresh_token.clone() {
                info!("refreshing credentials...");
                let fresh = self.refresh(&secrets, &refresh)?;
                self.store_token(&fresh)?;
                return Ok(fresh);
            }
        }

        info!("could not find usable credentials, requesting new credentials");
        let reply = consent(&consent_url(&secrets)?)?;
        let code = parse_consent_reply(&reply).ok_or(SheetsError::MissingAuthCode)?;
        let token = self.exchange(&secrets, &code)?;
        self.store_token(&token)?;
        Ok(token)
    }

    fn load_secrets(&self) -> Result<ClientSecrets> {
        let path = self.credentials_path();
        if !path.exists() {
            return Err(SheetsError::MissingCredentials(self.auth_dir.clone()));
        }
        let file: SecretsFile = serde_json::from_str(&fs::read_to_string(path)?)?;
        Ok(file.installed)
    }

    /// Cached token, if one parses. A corrupt or missing file means
    /// re-authenticating, not failing.
    fn load_token(&self) -> Option<StoredToken> {
        let content = fs::read_to_string(self.token_path()).ok()?;
        let token = serde_json::from_str(&content).ok()?;
        info!("loaded credentials from {}", self.token_path().display());
        Some(token)
    }

    fn store_token(&self, token: &StoredToken) -> Result<()> {
        atomic_write_private(
            &self.token_path(),
            serde_json::to_string_pretty(token)?.as_bytes(),
        )
    }

    fn refresh(&self, secrets: &ClientSecrets, refresh_token: &str) -> Result<StoredToken> {
        let response = self
            .http
            .post(&secrets.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
                ("refresh_token", refresh_token),
            ])
            .send()?;
        // Google omits the refresh token from refresh responses.
        token_from_response(response, Some(refresh_token.to_string()))
    }

    fn exchange(&self, secrets: &ClientSecrets, code: &str) -> Result<StoredToken> {
        let response = self
            .http
            .post(&secrets.token_uri)
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
                ("redirect_uri", redirect_uri(secrets)),
                ("code", code),
            ])
            .send()?;
        token_from_response(response, None)
    }
}

fn token_from_response(response: Response, fallback_refresh: Option<String>) -> Result<StoredToken> {
    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(SheetsError::TokenEndpoint { status, body });
    }
    let parsed: TokenResponse = serde_json::from_str(&body)?;
    Ok(StoredToken {
        access_token: parsed.access_token,
        refresh_token: parsed.refresh_token.or(fallback_refresh),
        expiry: Utc::now() + Duration::seconds(parsed.expires_in),
    })
}

/// Consent-page URL the user opens in a browser.
pub fn consent_url(secrets: &ClientSecrets) -> Result<String> {
    let mut url = Url::parse(&secrets.auth_uri)?;
    url.query_pairs_mut()
        .append_pair("client_id", &secrets.client_id)
        .append_pair("redirect_uri", redirect_uri(secrets))
        .append_pair("response_type", "code")
        .append_pair("scope", SPREADSHEETS_SCOPE)
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent");
    Ok(url.into())
}

/// Pull the authorization code out of whatever the user pasted: either the
/// bare code or the full redirect URL carrying `?code=`.
fn parse_consent_reply(input: &str) -> Option<String> {
    let value = input.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(value) {
        return url
            .query_pairs()
            .find_map(|(k, v)| (k == "code").then(|| v.into_owned()));
    }
    Some(value.to_string())
}

/// Atomic write with owner-only permissions; the token grants spreadsheet
/// access and must not be world-readable.
fn atomic_write_private(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file().set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ─── Tests ────────────────────────────────────────────────────────────────
