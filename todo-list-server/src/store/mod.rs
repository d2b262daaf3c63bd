//! Task store adapter.
//!
//! The store owns the connection lifecycle to the task database and exposes the
//! CRUD primitives used by the API handlers. Readiness is explicit: callers ask
//! [`TaskStore::ensure_ready`] before doing work, which heals a dropped
//! connection with one more round of bounded reconnect attempts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::task::{NewTask, Task, TaskChanges};

mod connection;
mod database;

pub use connection::{ConnectionSettings, Connector, DatabaseConnector, StoreConnection};
pub use database::DatabaseTaskStore;

#[cfg(test)]
pub use connection::MockConnector;

/// Error type for task store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A required field is missing or empty.
    #[error("Validation failed: {0}")]
    Validation(String),
    /// No task exists with the given ID.
    #[error("Task with ID {0} not found")]
    NotFound(String),
    /// The database connection is not ready.
    #[error("Database connection not ready")]
    Unavailable,
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Connection state reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

impl From<bool> for ConnectionState {
    fn from(ready: bool) -> Self {
        if ready {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }
}

/// Storage for tasks behind a self-healing connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Returns whether the store is connected, without side effects.
    async fn is_ready(&self) -> bool;

    /// Returns whether the store is connected, reconnecting first if it is not.
    async fn ensure_ready(&self) -> bool;

    /// Lists all tasks, newest `created_at` first.
    async fn list(&self) -> Result<Vec<Task>, StoreError>;

    /// Persists a new task. The store assigns the ID and creation time.
    async fn create(&self, new_task: NewTask) -> Result<Task, StoreError>;

    /// Applies the supplied fields to an existing task.
    async fn update(&self, id: &str, changes: TaskChanges) -> Result<Task, StoreError>;

    /// Deletes a task, returning it.
    async fn delete_by_id(&self, id: &str) -> Result<Task, StoreError>;

    /// Deletes every completed task, returning how many were removed.
    async fn delete_all_completed(&self) -> Result<u64, StoreError>;
}

/// Rejects task text that is empty or only whitespace.
pub(crate) fn validate_text(text: String) -> Result<String, StoreError> {
    if text.trim().is_empty() {
        return Err(StoreError::Validation("Task text is required".to_string()));
    }
    Ok(text)
}
