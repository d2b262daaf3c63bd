use async_trait::async_trait;
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection, DbErr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::StoreError;

/// Bounded reconnect policy for the store connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Attempts made by a single `connect` call.
    pub max_attempts: u32,
    /// Pause between two failed attempts.
    pub retry_delay: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Opens connections to the task database.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a fresh connection with an up-to-date schema.
    async fn open(&self) -> Result<DatabaseConnection, DbErr>;
}

/// Connects to a database URL and applies pending migrations.
pub struct DatabaseConnector {
    url: String,
}

impl DatabaseConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for DatabaseConnector {
    async fn open(&self) -> Result<DatabaseConnection, DbErr> {
        let db = Database::connect(&self.url).await?;
        migration::Migrator::up(&db, None).await?;
        Ok(db)
    }
}

/// The single logical connection to the task database.
///
/// The handle is empty while disconnected. Concurrent callers may each run a
/// reconnect; the last successful one wins.
pub struct StoreConnection {
    connector: Box<dyn Connector>,
    settings: ConnectionSettings,
    connection: RwLock<Option<DatabaseConnection>>,
}

impl StoreConnection {
    pub fn new(connector: impl Connector + 'static, settings: ConnectionSettings) -> Self {
        Self {
            connector: Box::new(connector),
            settings,
            connection: RwLock::new(None),
        }
    }

    /// Tries to connect up to `max_attempts` times, sleeping `retry_delay`
    /// between failures.
    ///
    /// # Returns
    ///
    /// `true` once connected. Exhausting the attempts leaves the store
    /// disconnected and returns `false`.
    #[tracing::instrument(skip(self))]
    pub async fn connect(&self) -> bool {
        let max_attempts = self.settings.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            tracing::info!(
                "Attempting to connect to the database (attempt {}/{})",
                attempt,
                max_attempts
            );
            match self.connector.open().await {
                Ok(db) => {
                    *self.connection.write().await = Some(db);
                    tracing::info!("Connected to the database successfully");
                    return true;
                }
                Err(err) => {
                    tracing::error!("Database connection attempt {} failed: {}", attempt, err);
                    if attempt < max_attempts {
                        tracing::info!(
                            "Waiting {:?} before retry...",
                            self.settings.retry_delay
                        );
                        tokio::time::sleep(self.settings.retry_delay).await;
                    }
                }
            }
        }
        tracing::error!("Max retries reached. Could not connect to the database");
        false
    }

    pub async fn is_ready(&self) -> bool {
        self.connection.read().await.is_some()
    }

    /// Reconnects if needed and reports whether the store can serve requests.
    pub async fn ensure_ready(&self) -> bool {
        if self.is_ready().await {
            return true;
        }
        tracing::warn!("Database not ready, attempting to reconnect...");
        self.connect().await
    }

    /// Returns the live connection handle.
    pub async fn handle(&self) -> Result<DatabaseConnection, StoreError> {
        self.connection
            .read()
            .await
            .clone()
            .ok_or(StoreError::Unavailable)
    }

    pub async fn mark_disconnected(&self) {
        if self.connection.write().await.take().is_some() {
            tracing::warn!("Database connection marked as disconnected");
        }
    }

    /// Pings the live connection. A failed ping drops the handle and
    /// reconnects right away.
    #[tracing::instrument(skip(self))]
    pub async fn check_liveness(&self) {
        let Ok(db) = self.handle().await else {
            return;
        };
        if let Err(err) = db.ping().await {
            tracing::warn!("Database disconnected ({}). Attempting to reconnect...", err);
            self.mark_disconnected().await;
            self.connect().await;
        }
    }

    /// Spawns a background task running [`Self::check_liveness`] every `interval`.
    pub fn spawn_monitor(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let connection = Arc::clone(self);
        let interval = interval.max(Duration::from_millis(100));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                connection.check_liveness().await;
            }
        })
    }
}
