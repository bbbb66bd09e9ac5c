//! Remote side of the connection lifecycle.
//!
//! [`ConnectionGateway`] is the seam between the lifecycle manager and the
//! backend. [`HttpGateway`] talks to a real server; tests substitute an
//! in-memory implementation.

mod http;

use async_trait::async_trait;
use serde_json::Value;

use crate::connection::{Connection, ConnectionId, Repository, TestResult, VersionInfo};
use crate::error::Result;
use crate::provider::{Payload, Provider};

pub use http::{GatewayConfig, HttpGateway, TRACING_TARGET};

/// Plugin connection endpoints, scoped per call to one provider.
///
/// Implementations do not retry and only interpret status codes as far as
/// each method documents.
#[async_trait]
pub trait ConnectionGateway: Send + Sync {
    async fn list(&self, provider: &dyn Provider) -> Result<Vec<Connection>>;

    async fn get(&self, provider: &dyn Provider, id: &ConnectionId) -> Result<Connection>;

    /// Fails unless the backend answers 200 or 201.
    async fn create(&self, provider: &dyn Provider, payload: &Payload) -> Result<Connection>;

    /// Fails unless the backend answers 200 or 201.
    async fn update(
        &self,
        provider: &dyn Provider,
        id: &ConnectionId,
        payload: &Payload,
    ) -> Result<Connection>;

    async fn delete(&self, provider: &dyn Provider, id: &ConnectionId) -> Result<Value>;

    /// Succeeds only on HTTP 200 with `success: true` in the body; any other
    /// 2xx answer yields a failed result rather than an error.
    async fn test(&self, provider: &dyn Provider, payload: &Payload) -> Result<TestResult>;

    async fn domain_repositories(&self) -> Result<Vec<Repository>>;

    async fn version(&self) -> Result<VersionInfo>;
}
