//! Connection lifecycle manager.
//!
//! One [`ConnectionManager`] drives one connection-edit session for one
//! provider: it owns the draft, the cached connection list and every
//! in-flight flag, and it is the only writer of its [`SessionState`].
//! Failures never escape an operation. They are recorded in the state and
//! announced as [`ManagerEvent::Notify`] toasts, so callers observe the
//! session through [`ConnectionManager::snapshot`], [`ConnectionManager::watch`]
//! and [`ConnectionManager::subscribe`].

mod state;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tokio::sync::{broadcast, watch};

use crate::connection::{
    Connection, ConnectionId, ConnectionStatus, Field, Fields, TestResult, TestStatus,
};
use crate::error::{Error, Result};
use crate::gateway::ConnectionGateway;
use crate::provider::{self, AuthStyle, Payload, Provider};

pub use state::{
    DeletePhase, DeletedConnection, FetchPhase, Intent, ManagerEvent, NetworkMode, Notification,
    SavePhase, SessionState, TestPhase,
};

/// Tracing target for lifecycle transitions.
pub const TRACING_TARGET: &str = "lakeconn::manager";

const EVENT_CAPACITY: usize = 64;

/// Fallback label for a connection id that is not in the list.
const UNKNOWN_CONNECTION_NAME: &str = "(Instance)";

pub struct ConnectionManager<G> {
    gateway: Arc<G>,
    provider: &'static dyn Provider,
    update_mode: bool,
    connection_id: Option<ConnectionId>,
    /// Batch-test fan-out cap; `None` tests every connection at once.
    test_concurrency: Option<usize>,
    state: watch::Sender<SessionState>,
    events: broadcast::Sender<ManagerEvent>,
}

impl<G: ConnectionGateway> ConnectionManager<G> {
    /// Opens a create-mode session for `provider`.
    pub fn new(gateway: Arc<G>, provider: &str) -> Result<Self> {
        let provider = provider::get_provider(provider)?;
        let (state, _) = watch::channel(SessionState {
            connection_limits: provider::default_connection_limits(),
            ..SessionState::default()
        });
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            gateway,
            provider,
            update_mode: false,
            connection_id: None,
            test_concurrency: None,
            state,
            events,
        })
    }

    /// Switches the session to update mode for an existing connection.
    pub fn editing(mut self, id: ConnectionId) -> Self {
        self.update_mode = true;
        self.connection_id = Some(id);
        self
    }

    pub fn with_test_concurrency(mut self, limit: Option<usize>) -> Self {
        self.test_concurrency = limit;
        self
    }

    /// Overrides the built-in connection limits for the listed providers.
    pub fn with_connection_limits(self, limits: HashMap<String, usize>) -> Self {
        self.set_connection_limits(limits);
        self
    }

    pub fn provider(&self) -> &'static dyn Provider {
        self.provider
    }

    pub fn is_update_mode(&self) -> bool {
        self.update_mode
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ManagerEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ManagerEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    fn notify(&self, notification: Notification) {
        self.emit(ManagerEvent::Notify(notification));
    }

    // -- Draft ----------------------------------------------------------------

    pub fn set_field(&self, field: Field, value: impl Into<String>) {
        let value = value.into();
        self.state.send_modify(|s| s.fields.set_field(field, value));
    }

    pub fn set_token_slot(&self, index: usize, value: impl Into<String>) {
        let value = value.into();
        self.state.send_modify(|s| s.fields.set_token_slot(index, value));
    }

    /// Starts a new, unsaved connection.
    pub fn clear_connection(&self) {
        self.state.send_modify(|s| s.fields.clear());
    }

    pub fn set_active_connection(&self, conn: Connection) {
        self.state.send_modify(|s| {
            s.fields.hydrate(&conn);
            s.active_connection = conn;
        });
    }

    pub fn set_connection_limits(&self, limits: HashMap<String, usize>) {
        let name = self.provider.name();
        self.state.send_modify(|s| {
            s.connection_limits.extend(limits);
            s.limit_reached = s
                .connection_limits
                .get(name)
                .map_or(false, |limit| s.connection_count >= *limit);
        });
    }

    /// Name of the connection with `id`, or a generic label.
    pub fn connection_name(id: &ConnectionId, connections: &[Connection]) -> String {
        connections
            .iter()
            .find(|c| c.id.as_ref() == Some(id))
            .map(|c| c.name.clone())
            .unwrap_or_else(|| UNKNOWN_CONNECTION_NAME.to_string())
    }

    // -- Fetch ----------------------------------------------------------------

    /// Loads one connection into the draft. `id` defaults to the session's
    /// connection. A silent fetch leaves the fetching indicator alone.
    ///
    /// Only the most recently started fetch may apply its result; earlier
    /// ones that finish late are dropped.
    pub async fn fetch_connection(&self, silent: bool, id: Option<ConnectionId>) {
        let Some(id) = id.or_else(|| self.connection_id.clone()) else {
            self.state
                .send_modify(|s| s.fail("No connection selected".to_string()));
            return;
        };

        let mut generation = 0;
        self.state.send_modify(|s| {
            s.fetch_generation += 1;
            generation = s.fetch_generation;
            if !silent {
                s.fetches_in_flight += 1;
                s.fetch = FetchPhase::Fetching;
            }
            s.errors.clear();
        });
        // A silent refetch must not wipe toasts already on screen.
        if !silent {
            self.emit(ManagerEvent::ClearNotifications);
        }

        tracing::debug!(
            target: TRACING_TARGET,
            provider = self.provider.name(),
            connection_id = %id,
            generation,
            "fetching connection"
        );
        let result = self.gateway.get(self.provider, &id).await;

        let mut stale = false;
        self.state.send_modify(|s| {
            if !silent {
                s.fetches_in_flight = s.fetches_in_flight.saturating_sub(1);
            }
            if generation != s.fetch_generation {
                stale = true;
                return;
            }
            match &result {
                Ok(conn) => {
                    s.fields.hydrate(conn);
                    s.active_connection = conn.clone();
                    s.fetch = FetchPhase::Ready;
                }
                Err(e) => {
                    s.active_connection = Connection::default();
                    s.fields.clear();
                    s.fail(e.to_string());
                    s.fetch = FetchPhase::Failed;
                }
            }
        });

        if stale {
            tracing::debug!(
                target: TRACING_TARGET,
                connection_id = %id,
                generation,
                "discarding stale connection fetch"
            );
            return;
        }
        if let Err(e) = result {
            tracing::warn!(target: TRACING_TARGET, connection_id = %id, error = %e, "failed to fetch connection");
            self.notify(Notification::danger(e.to_string()));
        }
    }

    /// Lists the provider's connections. With `all_sources`, also lists
    /// every registered provider into `all_provider_connections`.
    pub async fn fetch_all_connections(&self, notify: bool, all_sources: bool) {
        let mut generation = 0;
        self.state.send_modify(|s| {
            s.list_generation += 1;
            generation = s.list_generation;
            s.fetches_in_flight += 1;
            s.errors.clear();
        });
        self.emit(ManagerEvent::ClearNotifications);

        let result = self.list_connections(all_sources).await;

        let name = self.provider.name();
        let mut stale = false;
        self.state.send_modify(|s| {
            s.fetches_in_flight = s.fetches_in_flight.saturating_sub(1);
            if generation != s.list_generation {
                stale = true;
                return;
            }
            match &result {
                Ok((own, all)) => {
                    // A listing says nothing about liveness.
                    s.connections = own
                        .iter()
                        .cloned()
                        .map(|c| c.with_status(ConnectionStatus::Offline))
                        .collect();
                    s.connection_count = own.len();
                    s.limit_reached = s
                        .connection_limits
                        .get(name)
                        .map_or(false, |limit| s.connection_count >= *limit);
                    if let Some(all) = all {
                        s.all_provider_connections = all.clone();
                    }
                    s.network = NetworkMode::Online;
                }
                Err(e) => {
                    s.connections.clear();
                    s.connection_count = 0;
                    s.limit_reached = false;
                    s.fail(e.to_string());
                    if e.is_offline() {
                        s.network = NetworkMode::Offline;
                    }
                }
            }
        });

        if stale {
            tracing::debug!(target: TRACING_TARGET, generation, "discarding stale connection list");
            return;
        }
        match result {
            Ok((own, _)) => {
                tracing::debug!(target: TRACING_TARGET, provider = name, count = own.len(), "loaded connections");
                if notify {
                    self.notify(Notification::success("Loaded all connections."));
                }
            }
            Err(e) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    provider = name,
                    status = e.status(),
                    error = %e,
                    "failed to load connections"
                );
                self.notify(Notification::danger(format!(
                    "Failed to Load Connections - {}",
                    e
                )));
            }
        }
    }

    async fn list_connections(
        &self,
        all_sources: bool,
    ) -> Result<(Vec<Connection>, Option<Vec<Connection>>)> {
        let own = self.gateway.list(self.provider).await?;
        if !all_sources {
            return Ok((own, None));
        }

        let lists = try_join_all(provider::all_providers().into_iter().map(|p| async move {
            let conns = self.gateway.list(p).await?;
            Ok::<_, Error>(
                conns
                    .into_iter()
                    .map(|c| Connection {
                        provider: p.name().to_string(),
                        ..c
                    })
                    .map(|c| c.with_status(ConnectionStatus::Online))
                    .collect::<Vec<_>>(),
            )
        }))
        .await?;

        Ok((own, Some(lists.into_iter().flatten().collect())))
    }

    /// Loads the domain layer repositories.
    pub async fn fetch_domain_repositories(&self) {
        self.state.send_modify(|s| {
            s.fetches_in_flight += 1;
            s.errors.clear();
        });
        self.emit(ManagerEvent::ClearNotifications);

        let result = self.gateway.domain_repositories().await;

        self.state.send_modify(|s| {
            s.fetches_in_flight = s.fetches_in_flight.saturating_sub(1);
            match &result {
                Ok(repos) => s.domain_repositories = repos.clone(),
                Err(e) => {
                    s.domain_repositories.clear();
                    s.fail(e.to_string());
                }
            }
        });

        if let Err(e) = result {
            tracing::warn!(target: TRACING_TARGET, error = %e, "failed to fetch domain layer repositories");
            self.notify(Notification::danger(e.to_string()));
        }
    }

    // -- Save -----------------------------------------------------------------

    /// Saves the draft. `extra` is merged over the provider payload and wins
    /// on conflicts. Update mode patches the session's connection, create
    /// mode posts a new one.
    pub async fn save_connection(&self, extra: Payload) {
        let (fields, active_id) = {
            let s = self.state.borrow();
            (s.fields.fields().clone(), s.active_connection.id.clone())
        };

        let mut payload = self.provider.to_payload(&fields);
        payload.insert(Field::Name.to_string(), Value::from(fields.name.as_str()));
        payload.extend(extra);

        self.state.send_modify(|s| {
            s.save = SavePhase::Saving;
            s.errors.clear();
            s.show_error = false;
        });
        self.emit(ManagerEvent::ClearNotifications);

        let result = if self.update_mode {
            match active_id.or_else(|| self.connection_id.clone()) {
                Some(id) => self.gateway.update(self.provider, &id, &payload).await,
                None => Err(Error::validation("Cannot update a connection without an id")),
            }
        } else {
            self.gateway.create(self.provider, &payload).await
        };

        let saved = match result {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    provider = self.provider.name(),
                    update = self.update_mode,
                    error = %e,
                    "failed to save connection"
                );
                self.state.send_modify(|s| {
                    s.save = SavePhase::Failed;
                    s.show_error = true;
                    s.saved = None;
                    s.fail(e.to_string());
                });
                self.notify(Notification::danger(
                    "Connection failed to save, please try again.",
                ));
                return;
            }
        };

        tracing::info!(
            target: TRACING_TARGET,
            provider = self.provider.name(),
            connection_id = ?saved.id,
            update = self.update_mode,
            "connection saved"
        );
        self.state.send_modify(|s| {
            s.save = SavePhase::Saved;
            s.saved = Some(saved.clone());
            s.active_connection.merge(&saved);
        });
        self.notify(Notification::success("Connection saved successfully."));
        self.emit(ManagerEvent::Saved(saved.clone()));

        if self.update_mode {
            let id = saved.id.clone().or_else(|| self.connection_id.clone());
            self.fetch_connection(true, id).await;
        }

        if self.provider.auth_style() == AuthStyle::Token && fields.has_composite_token() {
            tracing::debug!(target: TRACING_TARGET, "composite token saved, testing it");
            self.test_connection(true, self.provider.to_payload(&fields))
                .await;
        }
    }

    // -- Test -----------------------------------------------------------------

    /// Tests the draft, with `manual` merged over it.
    pub async fn test_connection(&self, notify: bool, manual: Payload) -> TestResult {
        self.test_connection_with(notify, manual, |_| {}, |_| {})
            .await
    }

    /// Like [`test_connection`](Self::test_connection), calling `on_success`
    /// or `on_fail` with the result. A transport failure counts as a failed
    /// test.
    pub async fn test_connection_with<S, F>(
        &self,
        notify: bool,
        manual: Payload,
        on_success: S,
        on_fail: F,
    ) -> TestResult
    where
        S: FnOnce(&TestResult),
        F: FnOnce(&TestResult),
    {
        let fields = self.state.borrow().fields.fields().clone();
        let mut payload = self.provider.to_payload(&fields);
        payload.extend(manual);
        let endpoint = payload
            .get(Field::Endpoint.as_str())
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        self.state.send_modify(|s| {
            s.tests_in_flight += 1;
            s.test = TestPhase::Testing;
            s.show_error = false;
        });
        self.emit(ManagerEvent::ClearNotifications);

        let (result, error) = match self.gateway.test(self.provider, &payload).await {
            Ok(result) => (result, None),
            Err(e) => (TestResult::failed(e.to_string()), Some(e)),
        };

        tracing::debug!(
            target: TRACING_TARGET,
            provider = self.provider.name(),
            %endpoint,
            success = result.success,
            "connection tested"
        );

        self.state.send_modify(|s| {
            s.tests_in_flight = s.tests_in_flight.saturating_sub(1);
            s.test_response = Some(result.clone());
            if result.success {
                s.test_status = TestStatus::Success;
                s.test = TestPhase::Passed;
            } else {
                s.test_status = TestStatus::Failed;
                s.test = TestPhase::Failed;
            }
            if let Some(e) = &error {
                s.fail(e.to_string());
            }
        });

        if result.success {
            if notify {
                self.notify(Notification::success(format!(
                    "Connection test OK. {}",
                    endpoint
                )));
            }
            on_success(&result);
        } else {
            if notify {
                self.notify(Notification::danger(format!(
                    "Connection test FAILED. {}",
                    result.message
                )));
            }
            on_fail(&result);
        }

        result
    }

    /// Tests every connection without toasts. Each result lands in
    /// `tested_connections` as `ONLINE` or `DISCONNECTED` as soon as it
    /// completes, replacing any earlier result for the same id.
    pub async fn test_all_connections(&self, connections: &[Connection]) {
        if connections.is_empty() {
            return;
        }
        let limit = self
            .test_concurrency
            .unwrap_or(connections.len())
            .max(1);

        tracing::info!(
            target: TRACING_TARGET,
            provider = self.provider.name(),
            count = connections.len(),
            limit,
            "testing all connections"
        );

        let state = &self.state;
        stream::iter(connections.iter().cloned())
            .map(|conn| async move {
                let payload = self.provider.to_payload(&Fields::from(&conn));
                let online = conn.clone().with_status(ConnectionStatus::Online);
                let offline = conn.with_status(ConnectionStatus::Disconnected);
                self.test_connection_with(
                    false,
                    payload,
                    |_| state.send_modify(|s| s.record_tested(online)),
                    |_| state.send_modify(|s| s.record_tested(offline)),
                )
                .await;
            })
            .buffer_unordered(limit)
            .collect::<Vec<()>>()
            .await;
    }

    // -- Delete ---------------------------------------------------------------

    /// Deletes `connection` on the backend. The cached list is left as is;
    /// callers re-list when they want the change reflected.
    pub async fn delete_connection(&self, connection: &Connection) {
        let Some(id) = connection.id.clone() else {
            let message = "Cannot delete a connection without an id";
            self.state.send_modify(|s| {
                s.delete = DeletePhase::Failed;
                s.deleted = None;
                s.fail(message.to_string());
            });
            self.notify(Notification::danger(format!(
                "Failed to delete connection - {}",
                message
            )));
            return;
        };

        self.state.send_modify(|s| {
            s.delete = DeletePhase::Deleting;
            s.errors.clear();
        });

        match self.gateway.delete(self.provider, &id).await {
            Ok(response) => {
                tracing::info!(
                    target: TRACING_TARGET,
                    provider = self.provider.name(),
                    connection_id = %id,
                    "connection deleted"
                );
                let deleted = DeletedConnection {
                    provider: self.provider.name().to_string(),
                    connection: connection.clone(),
                    response,
                };
                self.state.send_modify(|s| {
                    s.delete = DeletePhase::Deleted;
                    s.deleted = Some(deleted.clone());
                });
                self.emit(ManagerEvent::Deleted(deleted));
            }
            Err(e) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    connection_id = %id,
                    error = %e,
                    "failed to delete connection"
                );
                self.state.send_modify(|s| {
                    s.delete = DeletePhase::Failed;
                    s.deleted = None;
                    s.fail(e.to_string());
                });
                self.notify(Notification::danger(format!(
                    "Failed to delete connection - {}",
                    e
                )));
            }
        }
    }
}
