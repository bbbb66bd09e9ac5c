pub mod fields;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use fields::{Field, FieldStore, Fields};

/// Server-assigned connection id. The backend answers with numbers, but the
/// console also accepts string ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConnectionId {
    Number(u64),
    Text(String),
}

impl ConnectionId {
    /// Reads an id out of a JSON value, rejecting null, empty and non-scalar values.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(ConnectionId::Number),
            Value::String(s) if !s.is_empty() => s.parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionId::Number(n) => write!(f, "{}", n),
            ConnectionId::Text(s) => f.write_str(s),
        }
    }
}

impl FromStr for ConnectionId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Only canonical numbers become numeric ids; "007" stays text.
        Ok(match s.parse::<u64>() {
            Ok(n) if n.to_string() == s => ConnectionId::Number(n),
            _ => ConnectionId::Text(s.to_string()),
        })
    }
}

impl From<u64> for ConnectionId {
    fn from(n: u64) -> Self {
        ConnectionId::Number(n)
    }
}

/// Client-side liveness of a connection. Never sent by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Online,
    Offline,
    Disconnected,
    #[default]
    Pending,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionStatus::Online => "ONLINE",
            ConnectionStatus::Offline => "OFFLINE",
            ConnectionStatus::Disconnected => "DISCONNECTED",
            ConnectionStatus::Pending => "PENDING",
        };
        f.write_str(label)
    }
}

/// A configured provider instance as the console sees it.
///
/// `Connection::default()` is the null connection a session starts from and
/// falls back to when a fetch fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ConnectionId>,
    pub provider: String,
    pub name: String,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub status: ConnectionStatus,
    /// Server fields the console does not model (rate limits, timestamps, ...).
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Connection {
    pub fn with_status(mut self, status: ConnectionStatus) -> Self {
        self.status = status;
        self
    }

    /// Overlays the fields the server returned after a save onto this one.
    pub fn merge(&mut self, saved: &Connection) {
        if saved.id.is_some() {
            self.id = saved.id.clone();
        }
        if !saved.provider.is_empty() {
            self.provider = saved.provider.clone();
        }
        if !saved.name.is_empty() {
            self.name = saved.name.clone();
        }
        if !saved.endpoint.is_empty() {
            self.endpoint = saved.endpoint.clone();
        }
        for (slot, value) in [
            (&mut self.proxy, &saved.proxy),
            (&mut self.token, &saved.token),
            (&mut self.username, &saved.username),
            (&mut self.password, &saved.password),
        ] {
            if value.is_some() {
                *slot = value.clone();
            }
        }
        for (key, value) in &saved.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

/// Answer of the provider test endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

impl TestResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Outcome of the most recent connection test, in the console's numbering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum TestStatus {
    #[default]
    Pending = 0,
    Success = 1,
    Failed = 2,
}

/// A repository from the backend's domain layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
}
