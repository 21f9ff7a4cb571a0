use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Browser-redirect + poll credential exchange.
///
/// The server hands out a login URL for the user's browser plus a poll
/// endpoint; we poll at a fixed interval until the user approves, denies, or
/// the bounded attempt budget runs out. The sync engine never sees any of
/// this, only the resolved credentials.

const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;
const DEFAULT_MAX_POLLS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCredentials {
    pub url: String,
    pub username: String,
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    Requested,
    Pending { attempts: u32 },
    Succeeded(ResolvedCredentials),
    TimedOut,
    Denied,
}

/// A started flow: send the user to `login_url`, then poll.
#[derive(Debug)]
pub struct PendingLogin {
    pub login_url: String,
    pub state: LoginState,
    poll_token: String,
    poll_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct FlowInitResponse {
    poll: FlowPollEndpoint,
    login: String,
}

#[derive(Debug, Deserialize)]
struct FlowPollEndpoint {
    token: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct FlowPollSuccess {
    server: String,
    #[serde(rename = "loginName")]
    login_name: String,
    #[serde(rename = "appPassword")]
    app_password: String,
}

pub struct LoginFlow {
    client: Client,
    server_url: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl LoginFlow {
    pub fn new(server_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_polls: DEFAULT_MAX_POLLS,
        })
    }

    pub fn with_poll_settings(mut self, poll_interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = poll_interval;
        self.max_polls = max_polls;
        self
    }

    /// Initiates the flow and returns the login URL for the user's browser.
    pub async fn begin(&self) -> Result<PendingLogin> {
        let init_url = format!("{}/index.php/login/v2", self.server_url);
        info!("Requesting login flow from {}", init_url);

        let response = self
            .client
            .post(&init_url)
            .send()
            .await
            .with_context(|| format!("login flow request to {} failed", init_url))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Login flow request failed with status {}",
                response.status()
            ));
        }

        let init: FlowInitResponse = response
            .json()
            .await
            .context("login flow response was not valid JSON")?;

        Ok(PendingLogin {
            login_url: init.login,
            state: LoginState::Requested,
            poll_token: init.poll.token,
            poll_endpoint: init.poll.endpoint,
        })
    }

    /// Polls until the user resolves the flow or the attempt budget runs out.
    pub async fn poll_until_resolved(&self, pending: &mut PendingLogin) -> LoginState {
        for attempt in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;
            pending.state = LoginState::Pending { attempts: attempt };

            let response = match self
                .client
                .post(&pending.poll_endpoint)
                .form(&[("token", pending.poll_token.as_str())])
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!("Login poll attempt {} failed: {}", attempt, e);
                    continue;
                }
            };

            let status = response.status();

            // Not approved yet
            if status.as_u16() == 404 {
                debug!("Login still pending (attempt {}/{})", attempt, self.max_polls);
                continue;
            }

            if status.as_u16() == 401 || status.as_u16() == 403 {
                info!("Login was denied by the user or the server");
                pending.state = LoginState::Denied;
                return pending.state.clone();
            }

            if !status.is_success() {
                warn!("Unexpected login poll status {}", status);
                continue;
            }

            match response.json::<FlowPollSuccess>().await {
                Ok(success) => {
                    info!("Login approved for {}", success.login_name);
                    let credentials = ResolvedCredentials {
                        url: success.server,
                        username: success.login_name,
                        secret: success.app_password,
                    };
                    pending.state = LoginState::Succeeded(credentials);
                    return pending.state.clone();
                }
                Err(e) => {
                    warn!("Login poll returned unparsable body: {}", e);
                    continue;
                }
            }
        }

        pending.state = LoginState::TimedOut;
        pending.state.clone()
    }
}
