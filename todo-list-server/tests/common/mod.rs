use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue, DatabaseConnection};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use todo_list_server::entities::task;
use todo_list_server::store::{
    ConnectionSettings, Connector, DatabaseConnector, DatabaseTaskStore, StoreConnection,
};

pub fn sqlite_url(dir: &TempDir) -> String {
    format!("sqlite://{}?mode=rwc", dir.path().join("tasks.db").display())
}

/// Single attempt, no backoff, so failing reconnects return immediately.
pub fn fast_settings() -> ConnectionSettings {
    ConnectionSettings {
        max_attempts: 1,
        retry_delay: Duration::ZERO,
    }
}

pub struct TestContext {
    #[allow(dead_code)] // directory is kept to ensure the database file is not removed
    pub dir: TempDir,
    pub connection: Arc<StoreConnection>,
    pub store: Arc<DatabaseTaskStore>,
}

pub async fn setup() -> anyhow::Result<TestContext> {
    setup_with_connector(DatabaseConnector::new).await
}

pub async fn setup_with_connector<C, F>(make_connector: F) -> anyhow::Result<TestContext>
where
    C: Connector + 'static,
    F: FnOnce(String) -> C,
{
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();
    let dir = tempfile::tempdir()?;
    let connection = Arc::new(StoreConnection::new(
        make_connector(sqlite_url(&dir)),
        fast_settings(),
    ));
    anyhow::ensure!(connection.connect().await, "Failed to connect to test database");
    let store = Arc::new(DatabaseTaskStore::new(Arc::clone(&connection)));
    Ok(TestContext {
        dir,
        connection,
        store,
    })
}

/// Inserts a task row directly, bypassing the store.
pub async fn insert_task(
    db: &DatabaseConnection,
    id: &str,
    text: &str,
    completed: bool,
    created_at: DateTime<Utc>,
) -> task::Model {
    let active_model = task::ActiveModel {
        id: ActiveValue::Set(id.to_string()),
        text: ActiveValue::Set(text.to_string()),
        completed: ActiveValue::Set(completed),
        date: ActiveValue::Set(created_at),
        created_at: ActiveValue::Set(created_at),
    };
    active_model.insert(db).await.unwrap()
}
