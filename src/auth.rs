// Auth module: reads the OAuth client descriptor issued by the provider,
// caches the access/refresh token pair on disk, and walks the user
// through the one-time authorization when no usable token exists.
//
// The interactive step is behind the `Authorizer` trait so tests can run
// the whole bootstrap against a local fake token endpoint without a
// terminal.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Scope requested during authorization. Changing it invalidates any
/// previously saved token file, which must then be deleted by hand.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Fallback redirect for descriptors that carry no redirect URI.
const OOB_REDIRECT: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Tokens this close to expiry are treated as already expired.
const EXPIRY_LEEWAY_SECS: u64 = 60;

/// Shape of the downloaded credentials file: the secret sits under an
/// "installed" key for desktop apps or "web" for web apps.
#[derive(Deserialize)]
struct CredentialsFile {
    installed: Option<AppSecret>,
    web: Option<AppSecret>,
}

/// The provider-issued OAuth client descriptor. Read-only input; the
/// program never writes it.
#[derive(Clone, Debug, Deserialize)]
pub struct AppSecret {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

impl AppSecret {
    /// Parse the descriptor from a credentials file on disk. A missing
    /// or unreadable file is fatal to the run.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Unable to read credentials file {}", path.display()))?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let parsed: CredentialsFile =
            serde_json::from_str(data).context("Parsing credentials json")?;
        parsed
            .installed
            .or(parsed.web)
            .context("Credentials json has neither an \"installed\" nor a \"web\" section")
    }

    fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or(OOB_REDIRECT)
    }

    /// Consent-page URL the user must visit to produce an authorization
    /// code. Offline access is requested so the provider also returns a
    /// refresh token.
    pub fn authorization_url(&self) -> Result<Url> {
        Url::parse_with_params(
            &self.auth_uri,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri()),
                ("response_type", "code"),
                ("scope", DRIVE_SCOPE),
                ("access_type", "offline"),
                ("state", "state-token"),
            ],
        )
        .context("Building authorization url")
    }
}

/// The cached token artifact. `expires_at` is absolute unix seconds; a
/// token without one never expires locally.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

fn bearer() -> String {
    "Bearer".to_string()
}

impl Token {
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => unix_now() + EXPIRY_LEEWAY_SECS >= at,
            None => false,
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Body returned by the provider's token endpoint for both the code
/// exchange and the refresh grant.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl TokenResponse {
    // Refresh responses usually omit the refresh token; keep the one we
    // already had so later runs can still refresh.
    fn into_token(self, previous_refresh: Option<String>) -> Token {
        Token {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(bearer),
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: self.expires_in.map(|secs| unix_now() + secs),
        }
    }
}

/// On-disk store for the token artifact. The file is created with
/// owner-only permissions since it holds live credentials.
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TokenStore { path: path.into() }
    }

    /// Store location used by the binary: a dotfile in the user's home
    /// directory, next to where the session token of previous runs
    /// would be found.
    pub fn default_location() -> Self {
        let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        TokenStore {
            path: dir.join(".gdrive_tasks_token.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Token> {
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("Reading token file {}", self.path.display()))?;
        serde_json::from_str(&data).context("Parsing token file json")
    }

    pub fn save(&self, token: &Token) -> Result<()> {
        println!("Saving credential file to: {}", self.path.display());
        let data = serde_json::to_string_pretty(token).context("Encoding token json")?;
        write_private(&self.path, data.as_bytes())
            .with_context(|| format!("Writing token file {}", self.path.display()))
    }
}

#[cfg(unix)]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(data)
}

#[cfg(not(unix))]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    fs::write(path, data)
}

/// Supplies the one interactive step of the bootstrap: turning a
/// consent-page URL into an authorization code.
pub trait Authorizer {
    fn authorization_code(&self, auth_url: &Url) -> Result<String>;
}

/// Terminal implementation used by the binary: prints the consent URL
/// and reads back the code the user pastes.
pub struct ConsolePrompt;

impl Authorizer for ConsolePrompt {
    fn authorization_code(&self, auth_url: &Url) -> Result<String> {
        println!(
            "Go to the following link in your browser then type the authorization code:\n{}",
            auth_url
        );
        let code: String = dialoguer::Input::new()
            .with_prompt("Paste authorization code here")
            .interact_text()?;
        Ok(code.trim().to_string())
    }
}

/// Load-or-acquire flow for the access token:
/// 1. reuse the persisted token while it is still valid,
/// 2. refresh it when it is expired but carries a refresh token,
/// 3. otherwise run the interactive authorization and persist the result.
pub fn obtain_token(
    http: &Client,
    secret: &AppSecret,
    store: &TokenStore,
    authorizer: &dyn Authorizer,
) -> Result<Token> {
    match store.load() {
        Ok(token) if !token.is_expired() => Ok(token),
        Ok(token) => match token.refresh_token {
            Some(ref refresh) => {
                let refreshed = refresh_access_token(http, secret, refresh)?;
                store.save(&refreshed)?;
                Ok(refreshed)
            }
            // Expired with no way to refresh counts as invalid.
            None => authorize_interactively(http, secret, store, authorizer),
        },
        Err(_) => authorize_interactively(http, secret, store, authorizer),
    }
}

fn authorize_interactively(
    http: &Client,
    secret: &AppSecret,
    store: &TokenStore,
    authorizer: &dyn Authorizer,
) -> Result<Token> {
    let auth_url = secret.authorization_url()?;
    let code = authorizer.authorization_code(&auth_url)?;
    let token = exchange_code(http, secret, &code)?;
    store.save(&token)?;
    Ok(token)
}

fn exchange_code(http: &Client, secret: &AppSecret, code: &str) -> Result<Token> {
    let params = [
        ("code", code),
        ("client_id", secret.client_id.as_str()),
        ("client_secret", secret.client_secret.as_str()),
        ("redirect_uri", secret.redirect_uri()),
        ("grant_type", "authorization_code"),
    ];
    request_token(http, secret, &params, None).context("Unable to retrieve token from web")
}

fn refresh_access_token(http: &Client, secret: &AppSecret, refresh: &str) -> Result<Token> {
    let params = [
        ("refresh_token", refresh),
        ("client_id", secret.client_id.as_str()),
        ("client_secret", secret.client_secret.as_str()),
        ("grant_type", "refresh_token"),
    ];
    request_token(http, secret, &params, Some(refresh.to_string()))
        .context("Unable to refresh access token")
}

fn request_token(
    http: &Client,
    secret: &AppSecret,
    params: &[(&str, &str)],
    previous_refresh: Option<String>,
) -> Result<Token> {
    let res = http
        .post(&secret.token_uri)
        .form(params)
        .send()
        .context("Failed to send token request")?;
    if !res.status().is_success() {
        let status = res.status();
        let txt = res.text().unwrap_or_else(|_| "".into());
        bail!("Token endpoint returned {} - {}", status, txt);
    }
    let parsed: TokenResponse = res.json().context("Parsing token response json")?;
    Ok(parsed.into_token(previous_refresh))
}
