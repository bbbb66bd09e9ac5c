use std::collections::HashMap;

use serde_json::Value;

use crate::connection::{Connection, FieldStore, Repository, TestResult, TestStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchPhase {
    #[default]
    Idle,
    Fetching,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SavePhase {
    #[default]
    Idle,
    Saving,
    Saved,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TestPhase {
    #[default]
    Idle,
    Testing,
    Passed,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletePhase {
    #[default]
    Idle,
    Deleting,
    Deleted,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NetworkMode {
    #[default]
    Online,
    Offline,
}

/// A connection removed by the session, with the backend's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedConnection {
    pub provider: String,
    pub connection: Connection,
    pub response: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Success,
    Danger,
}

/// A user-facing toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub intent: Intent,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            intent: Intent::Success,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            intent: Intent::Danger,
            message: message.into(),
        }
    }
}

/// What a session announces besides its state.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagerEvent {
    Notify(Notification),
    ClearNotifications,
    Saved(Connection),
    Deleted(DeletedConnection),
}

/// Everything one connection-edit session knows. Observers read snapshots;
/// only the owning manager writes.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub fields: FieldStore,
    pub active_connection: Connection,

    pub fetch: FetchPhase,
    pub save: SavePhase,
    pub test: TestPhase,
    pub delete: DeletePhase,
    pub network: NetworkMode,

    pub test_status: TestStatus,
    pub test_response: Option<TestResult>,

    pub errors: Vec<String>,
    pub show_error: bool,

    pub connections: Vec<Connection>,
    pub all_provider_connections: Vec<Connection>,
    pub connection_count: usize,
    pub limit_reached: bool,
    /// Per-provider connection caps; a missing entry means unlimited.
    pub connection_limits: HashMap<String, usize>,
    /// Batch test results, one entry per connection id.
    pub tested_connections: Vec<Connection>,
    pub domain_repositories: Vec<Repository>,

    pub saved: Option<Connection>,
    pub deleted: Option<DeletedConnection>,

    pub(crate) fetches_in_flight: usize,
    pub(crate) tests_in_flight: usize,
    pub(crate) fetch_generation: u64,
    pub(crate) list_generation: u64,
}

impl SessionState {
    pub fn is_fetching(&self) -> bool {
        self.fetches_in_flight > 0
    }

    pub fn is_testing(&self) -> bool {
        self.tests_in_flight > 0
    }

    pub fn is_saving(&self) -> bool {
        self.save == SavePhase::Saving
    }

    pub fn is_deleting(&self) -> bool {
        self.delete == DeletePhase::Deleting
    }

    pub fn is_offline(&self) -> bool {
        self.network == NetworkMode::Offline
    }

    /// Replaces any earlier batch result for the same connection. Results
    /// for connections without an id are always kept.
    pub(crate) fn record_tested(&mut self, conn: Connection) {
        if conn.id.is_some() {
            self.tested_connections.retain(|c| c.id != conn.id);
        }
        self.tested_connections.push(conn);
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.errors = vec![message];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionStatus;

    #[test]
    fn tested_connections_dedupe_by_id() {
        let mut state = SessionState::default();
        let conn = Connection {
            id: Some(1.into()),
            ..Connection::default()
        };

        state.record_tested(conn.clone().with_status(ConnectionStatus::Disconnected));
        state.record_tested(conn.with_status(ConnectionStatus::Online));

        assert_eq!(state.tested_connections.len(), 1);
        assert_eq!(state.tested_connections[0].status, ConnectionStatus::Online);
    }

    #[test]
    fn tested_connections_without_id_are_all_kept() {
        let mut state = SessionState::default();
        let unsaved = |name: &str| Connection {
            name: name.into(),
            ..Connection::default()
        };

        state.record_tested(unsaved("a").with_status(ConnectionStatus::Online));
        state.record_tested(unsaved("b").with_status(ConnectionStatus::Disconnected));

        assert_eq!(state.tested_connections.len(), 2);
    }
}
