use anyhow::Result;

use crate::config::{Config, Credentials};

/// WebDAV endpoint configuration
#[derive(Debug, Clone)]
pub struct WebDAVConfig {
    /// Base URL of the DAV file namespace, e.g.
    /// `https://cloud.example.com/remote.php/dav/files/alice`.
    pub server_url: String,
    pub username: String,
    pub password: String,
    pub timeout_seconds: u64,
}

/// Retry configuration for WebDAV operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub rate_limit_backoff_ms: u64, // Additional backoff for 429 responses
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000, // 1 second
            max_delay_ms: 30000,    // 30 seconds
            backoff_multiplier: 2.0,
            rate_limit_backoff_ms: 5000, // 5 seconds
        }
    }
}

impl WebDAVConfig {
    pub fn new(server_url: String, username: String, password: String) -> Self {
        Self {
            server_url,
            username,
            password,
            timeout_seconds: 30,
        }
    }

    /// Builds the endpoint configuration out of the application config.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let credentials = match &config.credentials {
            Some(Credentials::Password { username, password }) => (username.clone(), password.clone()),
            Some(Credentials::Token { username, access_token }) => {
                (username.clone(), access_token.clone())
            }
            None => return Err(anyhow::anyhow!("No credentials configured")),
        };

        Ok(Self::new(
            config.server_url.clone(),
            credentials.0,
            credentials.1,
        ))
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_url.is_empty() {
            return Err(anyhow::anyhow!("Server URL cannot be empty"));
        }

        if self.username.is_empty() {
            return Err(anyhow::anyhow!("Username cannot be empty"));
        }

        if self.password.is_empty() {
            return Err(anyhow::anyhow!("Password cannot be empty"));
        }

        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(anyhow::anyhow!("Server URL must start with http:// or https://"));
        }

        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> String {
        self.server_url.trim_end_matches('/').to_string()
    }

    /// Path component of the base URL, used to strip server prefixes from
    /// listing hrefs.
    pub fn base_path(&self) -> String {
        match url::Url::parse(&self.server_url) {
            Ok(parsed) => parsed.path().trim_end_matches('/').to_string(),
            Err(_) => String::new(),
        }
    }

    /// Full URL for a path inside the remote namespace, each segment
    /// percent-encoded.
    pub fn url_for_path(&self, path: &str) -> String {
        let clean_path = path.trim_start_matches('/');

        if clean_path.is_empty() {
            return self.base_url();
        }

        let encoded: Vec<String> = clean_path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();

        format!("{}/{}", self.base_url(), encoded.join("/"))
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WebDAVConfig {
        WebDAVConfig::new(
            "https://cloud.example.com/remote.php/dav/files/alice/".to_string(),
            "alice".to_string(),
            "secret".to_string(),
        )
    }

    #[test]
    fn url_for_path_joins_with_exactly_one_slash() {
        let config = config();
        assert_eq!(
            config.url_for_path("/Collectives/notes/a.md"),
            "https://cloud.example.com/remote.php/dav/files/alice/Collectives/notes/a.md"
        );
        assert_eq!(
            config.url_for_path("Collectives"),
            "https://cloud.example.com/remote.php/dav/files/alice/Collectives"
        );
    }

    #[test]
    fn url_for_path_encodes_segments_but_not_separators() {
        let config = config();
        assert_eq!(
            config.url_for_path("/Collectives/my notes/a b.md"),
            "https://cloud.example.com/remote.php/dav/files/alice/Collectives/my%20notes/a%20b.md"
        );
    }

    #[test]
    fn base_path_is_the_url_path_without_trailing_slash() {
        assert_eq!(config().base_path(), "/remote.php/dav/files/alice");
    }

    #[test]
    fn empty_path_maps_to_the_base_url() {
        assert_eq!(
            config().url_for_path("/"),
            "https://cloud.example.com/remote.php/dav/files/alice"
        );
    }
}
