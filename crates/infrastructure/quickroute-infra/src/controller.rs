//! HTTP client for a clash-compatible external controller.

use async_trait::async_trait;
use camino::Utf8Path;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use quickroute_app_core::{EnginePort, RemoteCallError, RemoteResult};
use quickroute_config::DEFAULT_CONTROLLER_TIMEOUT;
use quickroute_core::{EngineConfig, EnginePatch};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("invalid controller url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("controller request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("controller answered {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<ControllerError> for RemoteCallError {
    fn from(e: ControllerError) -> Self {
        RemoteCallError::new(e.to_string())
    }
}

pub struct ControllerClient {
    client: Client,
    base: Url,
    secret: Option<String>,
}

impl ControllerClient {
    pub fn new(base: &str, secret: Option<String>) -> Result<Self, ControllerError> {
        let client = Client::builder()
            .timeout(DEFAULT_CONTROLLER_TIMEOUT)
            .build()?;
        Self::with_client(client, base, secret)
    }

    pub fn with_client(
        client: Client,
        base: &str,
        secret: Option<String>,
    ) -> Result<Self, ControllerError> {
        let mut base = Url::parse(base).map_err(|e| ControllerError::InvalidUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ControllerError::InvalidUrl {
                url: base.to_string(),
                reason: "not a base url".into(),
            });
        }
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        Ok(Self {
            client,
            base,
            secret: secret.filter(|s| !s.is_empty()),
        })
    }

    pub async fn configs(&self) -> Result<EngineConfig, ControllerError> {
        let resp = self.send(self.request(Method::GET, "configs")?).await?;
        Ok(resp.json().await?)
    }

    pub async fn patch_configs(&self, patch: &EnginePatch) -> Result<(), ControllerError> {
        self.send(self.request(Method::PATCH, "configs")?.json(patch))
            .await?;
        Ok(())
    }

    pub async fn close_connections(&self) -> Result<(), ControllerError> {
        self.send(self.request(Method::DELETE, "connections")?)
            .await?;
        Ok(())
    }

    /// Makes the engine load the configuration file at `path`.
    pub async fn reload_from(&self, path: &Utf8Path) -> Result<(), ControllerError> {
        debug!(%path, "reloading engine configuration");
        let req = self
            .request(Method::PUT, "configs")?
            .query(&[("force", "true")])
            .json(&json!({ "path": path.as_str() }));
        self.send(req).await?;
        Ok(())
    }

    fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder, ControllerError> {
        let url = self
            .base
            .join(endpoint)
            .map_err(|e| ControllerError::InvalidUrl {
                url: format!("{}{endpoint}", self.base),
                reason: e.to_string(),
            })?;
        let req = self.client.request(method, url);
        Ok(match &self.secret {
            Some(secret) => req.bearer_auth(secret),
            None => req,
        })
    }

    async fn send(&self, req: RequestBuilder) -> Result<reqwest::Response, ControllerError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ControllerError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl EnginePort for ControllerClient {
    async fn fetch_engine_config(&self) -> RemoteResult<EngineConfig> {
        Ok(self.configs().await?)
    }

    async fn patch_live_config(&self, patch: &EnginePatch) -> RemoteResult<()> {
        Ok(self.patch_configs(patch).await?)
    }

    async fn close_all_connections(&self) -> RemoteResult<()> {
        Ok(self.close_connections().await?)
    }
}
