use anyhow::Result;
use reqwest::{Client, Method, Response};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::RemoteError;

use super::config::{RetryConfig, WebDAVConfig};

/// Owns the HTTP client and the retry policy. Callers get back the response
/// for statuses that need per-operation interpretation (404 on a stat, 405 on
/// a directory create); auth failures, transport errors and exhausted server
/// errors surface as `RemoteError`.
pub struct WebDAVConnection {
    client: Client,
    config: WebDAVConfig,
    retry_config: RetryConfig,
}

impl WebDAVConnection {
    pub fn new(config: WebDAVConfig, retry_config: RetryConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            config,
            retry_config,
        })
    }

    pub fn config(&self) -> &WebDAVConfig {
        &self.config
    }

    /// Tests basic connectivity with an OPTIONS request against the DAV root.
    pub async fn test_connection(&self) -> Result<(), RemoteError> {
        let url = self.config.base_url();
        let response = self.request(Method::OPTIONS, &url, None, None).await?;

        let status = response.status();
        if status.is_success() {
            debug!("WebDAV OPTIONS succeeded for {}", url);
            Ok(())
        } else {
            Err(RemoteError::Unexpected {
                path: url,
                status: status.as_u16(),
            })
        }
    }

    /// Performs an authenticated request with retry on transient failures.
    ///
    /// Success and 207 Multi-Status come back as `Ok`; so do 4xx statuses
    /// other than 401/403/429, which the caller maps per operation.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<String>,
        headers: Option<Vec<(&str, &str)>>,
    ) -> Result<Response, RemoteError> {
        let mut attempt = 0;
        let mut delay = self.retry_config.initial_delay_ms;

        loop {
            let mut request = self
                .client
                .request(method.clone(), url)
                .basic_auth(&self.config.username, Some(&self.config.password));

            if let Some(ref body_content) = body {
                request = request.body(body_content.clone());
            }

            if let Some(ref header_list) = headers {
                for (key, value) in header_list {
                    request = request.header(*key, *value);
                }
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() || status.as_u16() == 207 {
                        return Ok(response);
                    }

                    if status.as_u16() == 401 || status.as_u16() == 403 {
                        return Err(RemoteError::Unauthorized {
                            url: url.to_string(),
                        });
                    }

                    // Handle rate limiting
                    if status.as_u16() == 429 && attempt < self.retry_config.max_retries {
                        warn!(
                            "Rate limited by {}, backing off for {}ms",
                            url, self.retry_config.rate_limit_backoff_ms
                        );
                        sleep(Duration::from_millis(self.retry_config.rate_limit_backoff_ms)).await;
                        attempt += 1;
                        continue;
                    }

                    // Server errors are retried with exponential backoff
                    if status.is_server_error() {
                        if attempt < self.retry_config.max_retries {
                            warn!(
                                "Server error {} from {}, retrying in {}ms (attempt {}/{})",
                                status, url, delay, attempt + 1, self.retry_config.max_retries
                            );
                            sleep(Duration::from_millis(delay)).await;
                            delay = std::cmp::min(
                                (delay as f64 * self.retry_config.backoff_multiplier) as u64,
                                self.retry_config.max_delay_ms,
                            );
                            attempt += 1;
                            continue;
                        }

                        return Err(RemoteError::Server {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }

                    // Remaining client errors are operation-specific
                    return Ok(response);
                }
                Err(e) => {
                    if attempt < self.retry_config.max_retries {
                        warn!(
                            "Request error for {}: {}, retrying in {}ms (attempt {}/{})",
                            url, e, delay, attempt + 1, self.retry_config.max_retries
                        );
                        sleep(Duration::from_millis(delay)).await;
                        delay = std::cmp::min(
                            (delay as f64 * self.retry_config.backoff_multiplier) as u64,
                            self.retry_config.max_delay_ms,
                        );
                        attempt += 1;
                        continue;
                    }

                    if e.is_timeout() {
                        return Err(RemoteError::Timeout {
                            url: url.to_string(),
                            timeout_seconds: self.config.timeout_seconds,
                        });
                    }

                    return Err(RemoteError::Network {
                        url: url.to_string(),
                        details: e.to_string(),
                    });
                }
            }
        }
    }

    /// Reads the response body, mapping transport failures mid-read.
    pub async fn read_text(&self, url: &str, response: Response) -> Result<String, RemoteError> {
        response.text().await.map_err(|e| RemoteError::Network {
            url: url.to_string(),
            details: e.to_string(),
        })
    }
}
