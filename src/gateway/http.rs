use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Map, Value};
use url::Url;

use super::ConnectionGateway;
use crate::blueprint::{Blueprint, BlueprintList, BlueprintQuery};
use crate::connection::{Connection, ConnectionId, Repository, TestResult, VersionInfo};
use crate::error::{Error, Result};
use crate::provider::{Payload, Provider};

/// Tracing target for backend requests.
pub const TRACING_TARGET: &str = "lakeconn::gateway";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL every path is resolved against (`DEVLAKE_ENDPOINT`).
    pub endpoint: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Reqwest-backed gateway for the DevLake REST API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: Client,
    base: Url,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let base = Url::parse(&config.endpoint)?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "endpoint '{}' cannot be used as a base URL",
                config.endpoint
            )));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("lakeconn/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        tracing::debug!(
            target: TRACING_TARGET,
            endpoint = %base,
            timeout_ms = config.timeout.as_millis() as u64,
            "created HTTP gateway"
        );

        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("endpoint '{}' cannot be a base", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn connections_url(&self, provider: &dyn Provider, id: Option<&ConnectionId>) -> Result<Url> {
        match id {
            Some(id) => {
                let id = id.to_string();
                self.url(&["plugins", provider.name(), "connections", &id])
            }
            None => self.url(&["plugins", provider.name(), "connections"]),
        }
    }

    /// Sends a request and returns the status with the decoded body. An
    /// empty body decodes to `{}`.
    async fn send(&self, request: RequestBuilder) -> Result<(u16, Value)> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(target: TRACING_TARGET, error = %e, "request failed");
            Error::from(e)
        })?;

        let status = response.status().as_u16();
        let url = response.url().clone();
        let text = response.text().await?;

        if !(200..300).contains(&status) {
            let detail = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from));
            let message = match detail {
                Some(detail) => format!("Request failed with status code {}: {}", status, detail),
                None => format!("Request failed with status code {}", status),
            };
            tracing::warn!(target: TRACING_TARGET, %url, status, "backend rejected request");
            return Err(Error::network(message, Some(status)));
        }

        tracing::debug!(target: TRACING_TARGET, %url, status, "backend answered");

        let body = if text.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(&text)?
        };
        Ok((status, body))
    }

    fn saved_connection(provider: &dyn Provider, status: u16, body: &Value) -> Result<Connection> {
        if status != 200 && status != 201 {
            return Err(Error::network(
                format!("Unexpected status code {} while saving connection", status),
                Some(status),
            ));
        }
        provider.from_response(body)
    }

    pub async fn list_blueprints(&self, query: &BlueprintQuery) -> Result<BlueprintList> {
        let url = self.url(&["blueprints"])?;
        let (_, body) = self.send(self.http.get(url).query(&query.to_pairs())).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Activates or deactivates a blueprint's schedule.
    pub async fn set_blueprint_enabled(&self, id: u64, enable: bool) -> Result<Blueprint> {
        let id = id.to_string();
        let url = self.url(&["blueprints", &id])?;
        let (_, body) = self
            .send(self.http.patch(url).json(&json!({ "enable": enable })))
            .await?;
        Ok(serde_json::from_value(body)?)
    }
}

#[async_trait]
impl ConnectionGateway for HttpGateway {
    async fn list(&self, provider: &dyn Provider) -> Result<Vec<Connection>> {
        let url = self.connections_url(provider, None)?;
        let (_, body) = self.send(self.http.get(url)).await?;
        match body {
            Value::Array(items) => items.iter().map(|i| provider.from_response(i)).collect(),
            _ => Ok(Vec::new()),
        }
    }

    async fn get(&self, provider: &dyn Provider, id: &ConnectionId) -> Result<Connection> {
        let url = self.connections_url(provider, Some(id))?;
        let (_, body) = self.send(self.http.get(url)).await?;
        provider.from_response(&body)
    }

    async fn create(&self, provider: &dyn Provider, payload: &Payload) -> Result<Connection> {
        let url = self.connections_url(provider, None)?;
        let (status, body) = self.send(self.http.post(url).json(payload)).await?;
        Self::saved_connection(provider, status, &body)
    }

    async fn update(
        &self,
        provider: &dyn Provider,
        id: &ConnectionId,
        payload: &Payload,
    ) -> Result<Connection> {
        let url = self.connections_url(provider, Some(id))?;
        let (status, body) = self.send(self.http.patch(url).json(payload)).await?;
        Self::saved_connection(provider, status, &body)
    }

    async fn delete(&self, provider: &dyn Provider, id: &ConnectionId) -> Result<Value> {
        let url = self.connections_url(provider, Some(id))?;
        let (_, body) = self.send(self.http.delete(url)).await?;
        Ok(body)
    }

    async fn test(&self, provider: &dyn Provider, payload: &Payload) -> Result<TestResult> {
        let url = self.url(&["plugins", provider.name(), "test"])?;
        let (status, body) = self.send(self.http.post(url).json(payload)).await?;
        Ok(TestResult {
            success: status == 200 && body.get("success").and_then(Value::as_bool) == Some(true),
            message: body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }

    async fn domain_repositories(&self) -> Result<Vec<Repository>> {
        let url = self.url(&["domainlayer", "repos"])?;
        let (_, body) = self.send(self.http.get(url)).await?;
        match body.get("repos") {
            Some(repos) if !repos.is_null() => Ok(serde_json::from_value(repos.clone())?),
            _ => Ok(Vec::new()),
        }
    }

    async fn version(&self) -> Result<VersionInfo> {
        let url = self.url(&["version"])?;
        let (_, body) = self.send(self.http.get(url)).await?;
        Ok(serde_json::from_value(body)?)
    }
}
