pub mod github;
pub mod gitlab;
pub mod jenkins;
pub mod jira;

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::connection::{Connection, ConnectionId, Field, Fields};
use crate::error::{Error, Result};

/// JSON body sent to the connection and test endpoints.
pub type Payload = Map<String, Value>;

/// Keys `from_response` understands; everything else lands in `extra`.
const KNOWN_KEYS: &[&str] = &[
    "id",
    "ID",
    "name",
    "Name",
    "endpoint",
    "Endpoint",
    "proxy",
    "Proxy",
    "token",
    "Token",
    "auth",
    "basicAuthEncoded",
    "username",
    "Username",
    "password",
    "Password",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    /// `username` + `password`
    Basic,
    /// one opaque `token`, possibly several joined by commas
    Token,
}

/// Capabilities of one source-system integration.
///
/// Implementors only declare their shape; payload mapping in both
/// directions is shared so every operation consults the same table.
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;
    fn display_name(&self) -> &'static str;
    fn auth_style(&self) -> AuthStyle;
    fn supports_proxy(&self) -> bool;

    /// Older backends read the token under this key as well.
    fn legacy_token_alias(&self) -> Option<&'static str> {
        None
    }

    /// Maximum number of connections the console allows, if any.
    fn connection_limit(&self) -> Option<usize> {
        None
    }

    fn required_fields(&self) -> Vec<Field> {
        let mut fields = vec![Field::Endpoint];
        match self.auth_style() {
            AuthStyle::Basic => fields.extend([Field::Username, Field::Password]),
            AuthStyle::Token => fields.push(Field::Token),
        }
        if self.supports_proxy() {
            fields.push(Field::Proxy);
        }
        fields
    }

    /// Shapes draft fields into exactly the body this provider expects.
    fn to_payload(&self, fields: &Fields) -> Payload {
        let mut payload = Payload::new();
        for field in self.required_fields() {
            payload.insert(field.to_string(), Value::from(fields.get(field)));
        }
        if let Some(alias) = self.legacy_token_alias() {
            payload.insert(alias.to_string(), Value::from(fields.token.as_str()));
        }
        payload
    }

    /// Normalizes a server connection body. Lowercase keys win, capitalized
    /// keys are the fallback.
    fn from_response(&self, body: &Value) -> Result<Connection> {
        let obj: Map<String, Value> = serde_json::from_value(body.clone())?;

        let id = ["id", "ID"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(ConnectionId::from_value));

        let mut conn = Connection {
            id,
            provider: self.name().to_string(),
            name: text(&obj, &["name", "Name"]).unwrap_or_default(),
            endpoint: text(&obj, &["endpoint", "Endpoint"]).unwrap_or_default(),
            ..Connection::default()
        };

        if self.supports_proxy() {
            conn.proxy = text(&obj, &["proxy", "Proxy"]);
        }
        match self.auth_style() {
            AuthStyle::Basic => {
                conn.username = text(&obj, &["username", "Username"]);
                conn.password = text(&obj, &["password", "Password"]);
            }
            AuthStyle::Token => {
                conn.token = text(&obj, &["token", "Token", "auth", "basicAuthEncoded"]);
            }
        }

        conn.extra = obj
            .into_iter()
            .filter(|(k, _)| !KNOWN_KEYS.contains(&k.as_str()))
            .collect();

        Ok(conn)
    }
}

/// First non-empty string among `keys`.
fn text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    })
}

pub fn get_provider(name: &str) -> Result<&'static dyn Provider> {
    match name {
        "jira" => Ok(&jira::JiraProvider),
        "github" => Ok(&github::GithubProvider),
        "jenkins" => Ok(&jenkins::JenkinsProvider),
        "gitlab" => Ok(&gitlab::GitlabProvider),
        _ => Err(Error::UnsupportedProvider(name.to_string())),
    }
}

pub fn all_providers() -> [&'static dyn Provider; 4] {
    [
        &jira::JiraProvider,
        &github::GithubProvider,
        &jenkins::JenkinsProvider,
        &gitlab::GitlabProvider,
    ]
}

pub fn all_provider_names() -> &'static [&'static str] {
    &["jira", "github", "jenkins", "gitlab"]
}

/// Built-in connection limits keyed by provider name.
pub fn default_connection_limits() -> HashMap<String, usize> {
    all_providers()
        .iter()
        .filter_map(|p| p.connection_limit().map(|l| (p.name().to_string(), l)))
        .collect()
}

/// `to_payload` by provider name; unknown names fail instead of sending nothing.
pub fn to_payload(provider: &str, fields: &Fields) -> Result<Payload> {
    Ok(get_provider(provider)?.to_payload(fields))
}

pub fn from_response(provider: &str, body: &Value) -> Result<Connection> {
    get_provider(provider)?.from_response(body)
}
