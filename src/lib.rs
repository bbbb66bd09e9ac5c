//! Connection lifecycle management for DevLake-style pipeline backends.
//!
//! A [`manager::ConnectionManager`] drives the create, edit, test and delete
//! flows of data-source connections for one provider, on top of a
//! [`gateway::ConnectionGateway`] that talks to the backend.

pub mod blueprint;
pub mod connection;
pub mod error;
pub mod gateway;
pub mod manager;
pub mod provider;
pub mod storage;

pub use error::{Error, Result};
