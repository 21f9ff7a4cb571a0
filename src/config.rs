use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Credentials for the remote server. Exactly one mode is ever active;
/// switching modes replaces the whole value, so a stale password can never
/// linger next to a fresh token.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Credentials {
    Password { username: String, password: String },
    Token { username: String, access_token: String },
}

impl Credentials {
    pub fn username(&self) -> &str {
        match self {
            Credentials::Password { username, .. } => username,
            Credentials::Token { username, .. } => username,
        }
    }

    /// The secret sent as the basic-auth password, whichever mode is active.
    pub fn secret(&self) -> &str {
        match self {
            Credentials::Password { password, .. } => password,
            Credentials::Token { access_token, .. } => access_token,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub server_url: String,
    pub credentials: Option<Credentials>,
    /// Root directory on the remote side that is the sync target.
    pub collective_path: String,
    /// Vault-relative folder that is the sync source; empty means the whole vault.
    pub local_folder_path: String,
    /// Filesystem location of the vault itself.
    pub vault_path: PathBuf,
    /// 0 disables interval-driven syncing.
    pub sync_interval_minutes: u64,
    pub sync_on_startup: bool,
    pub sync_on_save: bool,
    pub startup_delay_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let username = env::var("COLLECTSYNC_USERNAME").unwrap_or_default();
        let password = env::var("COLLECTSYNC_PASSWORD").unwrap_or_default();
        let access_token = env::var("COLLECTSYNC_ACCESS_TOKEN").unwrap_or_default();

        if !password.is_empty() && !access_token.is_empty() {
            return Err(anyhow::anyhow!(
                "Both COLLECTSYNC_PASSWORD and COLLECTSYNC_ACCESS_TOKEN are set; configure exactly one"
            ));
        }

        let credentials = if !access_token.is_empty() {
            Some(Credentials::Token { username, access_token })
        } else if !password.is_empty() {
            Some(Credentials::Password { username, password })
        } else {
            None
        };

        let config = Config {
            server_url: env::var("COLLECTSYNC_SERVER_URL").unwrap_or_default(),
            credentials,
            collective_path: normalize_collective_path(
                &env::var("COLLECTSYNC_COLLECTIVE_PATH").unwrap_or_else(|_| "/Collectives".to_string()),
            ),
            local_folder_path: env::var("COLLECTSYNC_LOCAL_FOLDER").unwrap_or_default(),
            vault_path: PathBuf::from(env::var("COLLECTSYNC_VAULT_PATH").unwrap_or_else(|_| ".".to_string())),
            sync_interval_minutes: env::var("COLLECTSYNC_SYNC_INTERVAL_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            sync_on_startup: env_flag("COLLECTSYNC_SYNC_ON_STARTUP"),
            sync_on_save: env_flag("COLLECTSYNC_SYNC_ON_SAVE"),
            startup_delay_seconds: env::var("COLLECTSYNC_STARTUP_DELAY_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        };

        Ok(config)
    }

    /// A remote connection can be built from this configuration.
    pub fn is_connected(&self) -> bool {
        !self.server_url.is_empty()
            && self
                .credentials
                .as_ref()
                .map(|c| !c.username().is_empty() && !c.secret().is_empty())
                .unwrap_or(false)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_url.is_empty() {
            return Err(anyhow::anyhow!("Server URL cannot be empty"));
        }

        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(anyhow::anyhow!("Server URL must start with http:// or https://"));
        }

        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No credentials configured"))?;

        if credentials.username().is_empty() {
            return Err(anyhow::anyhow!("Username cannot be empty"));
        }

        if credentials.secret().is_empty() {
            return Err(anyhow::anyhow!("Password or access token cannot be empty"));
        }

        if !self.collective_path.starts_with('/') {
            return Err(anyhow::anyhow!("Collective path must start with '/'"));
        }

        Ok(())
    }

    /// Replaces the credential set with a password pair, clearing any token.
    pub fn set_password_credentials(&mut self, username: String, password: String) {
        self.credentials = Some(Credentials::Password { username, password });
    }

    /// Replaces the credential set with an app token, clearing any password.
    pub fn set_token_credentials(&mut self, username: String, access_token: String) {
        self.credentials = Some(Credentials::Token { username, access_token });
    }
}

/// Collective paths always start with `/` and never end with one, except the
/// root itself.
pub fn normalize_collective_path(path: &str) -> String {
    let trimmed = path.trim();
    let stripped = trimmed.trim_end_matches('/');
    if stripped.is_empty() {
        return "/".to_string();
    }
    if stripped.starts_with('/') {
        stripped.to_string()
    } else {
        format!("/{}", stripped)
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| {
            let v = v.trim().to_ascii_lowercase();
            v == "1" || v == "true" || v == "yes"
        })
        .unwrap_or(false)
}
