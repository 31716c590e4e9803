use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use webapp_api::auth::{Identity, TokenService};
use webapp_api::config::{AppConfig, Environment};

pub const TOKEN_KEY: &str =
    "integration-test-token-key-that-is-long-enough-for-hs512-0123456789abcdef";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub config: AppConfig,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start the full application on a free port, backed by an in-memory database.
    ///
    /// Each `#[tokio::test]` owns its runtime, so every test gets its own server.
    pub async fn spawn(environment: Environment) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let app_env = match environment {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Development => "development",
        };
        let config = AppConfig::from_lookup(|key| match key {
            "TOKEN_KEY" => Some(TOKEN_KEY.to_string()),
            "DATABASE_URL" => Some("sqlite::memory:".to_string()),
            "DATABASE_MAX_CONNECTIONS" => Some("1".to_string()),
            "APP_ENV" => Some(app_env.to_string()),
            "PORT" => Some(port.to_string()),
            _ => None,
        })?;

        let app = webapp_api::app::build(&config).await?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self {
            port,
            base_url,
            config,
            handle,
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Token signed with the server's own key
    pub fn token_for(&self, identity: &Identity) -> Result<String> {
        let tokens = TokenService::new(&self.config.security)?;
        Ok(tokens.issue(identity)?.token)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
