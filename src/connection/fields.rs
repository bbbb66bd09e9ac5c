//! Editable draft of one connection.
//!
//! The store holds plain strings and never validates. Providers decide
//! which of these fields reach the wire.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

use super::Connection;

/// Number of token slots a cleared draft exposes for editing.
const BLANK_TOKEN_SLOTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Endpoint,
    Proxy,
    Token,
    Username,
    Password,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Endpoint => "endpoint",
            Field::Proxy => "proxy",
            Field::Token => "token",
            Field::Username => "username",
            Field::Password => "password",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Field::Name),
            "endpoint" => Ok(Field::Endpoint),
            "proxy" => Ok(Field::Proxy),
            "token" => Ok(Field::Token),
            "username" => Ok(Field::Username),
            "password" => Ok(Field::Password),
            other => Err(Error::validation(format!("Unknown field: '{}'", other))),
        }
    }
}

/// The generic field set every provider maps from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    pub name: String,
    pub endpoint: String,
    pub proxy: String,
    pub token: String,
    pub username: String,
    pub password: String,
}

impl Fields {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Endpoint => &self.endpoint,
            Field::Proxy => &self.proxy,
            Field::Token => &self.token,
            Field::Username => &self.username,
            Field::Password => &self.password,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Name => self.name = value,
            Field::Endpoint => self.endpoint = value,
            Field::Proxy => self.proxy = value,
            Field::Token => self.token = value,
            Field::Username => self.username = value,
            Field::Password => self.password = value,
        }
    }

    /// True when the token packs more than one credential.
    pub fn has_composite_token(&self) -> bool {
        !self.token.is_empty() && self.token.split(',').count() > 1
    }
}

impl From<&Connection> for Fields {
    fn from(conn: &Connection) -> Self {
        Self {
            name: conn.name.clone(),
            endpoint: conn.endpoint.clone(),
            proxy: conn.proxy.clone().unwrap_or_default(),
            token: conn.token.clone().unwrap_or_default(),
            username: conn.username.clone().unwrap_or_default(),
            password: conn.password.clone().unwrap_or_default(),
        }
    }
}

/// Draft fields plus the indexed slots of a composite token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldStore {
    fields: Fields,
    token_slots: BTreeMap<usize, String>,
}

impl Default for FieldStore {
    fn default() -> Self {
        Self {
            fields: Fields::default(),
            token_slots: blank_slots(),
        }
    }
}

impl FieldStore {
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn get(&self, field: Field) -> &str {
        self.fields.get(field)
    }

    pub fn token_slots(&self) -> &BTreeMap<usize, String> {
        &self.token_slots
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        self.fields.set(field, value);
    }

    /// Edits one sub-token and recomposes the draft token from the
    /// non-empty slots, in slot order.
    pub fn set_token_slot(&mut self, index: usize, value: impl Into<String>) {
        self.token_slots.insert(index, value.into());
        self.fields.token = self
            .token_slots
            .values()
            .filter(|t| !t.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(",");
    }

    /// Resets every field and the token slots for a new, unsaved connection.
    pub fn clear(&mut self) {
        self.fields = Fields::default();
        self.token_slots = blank_slots();
    }

    /// Mirrors a fetched connection into the draft.
    pub fn hydrate(&mut self, conn: &Connection) {
        self.fields = Fields::from(conn);
        self.token_slots = match conn.token.as_deref() {
            Some(token) => split_token(token),
            None => blank_slots(),
        };
    }
}

fn blank_slots() -> BTreeMap<usize, String> {
    (0..BLANK_TOKEN_SLOTS).map(|i| (i, String::new())).collect()
}

fn split_token(token: &str) -> BTreeMap<usize, String> {
    token
        .split(',')
        .enumerate()
        .map(|(i, part)| (i, part.to_string()))
        .collect()
}
