use async_trait::async_trait;
use chrono::Utc;
use sea_orm::*;
use std::sync::Arc;
use uuid::Uuid;

use super::{StoreConnection, StoreError, TaskStore, validate_text};
use crate::entities::task;
use crate::task::{NewTask, Task, TaskChanges};

/// [`TaskStore`] backed by a SeaORM database connection.
pub struct DatabaseTaskStore {
    connection: Arc<StoreConnection>,
}

impl DatabaseTaskStore {
    pub fn new(connection: Arc<StoreConnection>) -> Self {
        Self { connection }
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> &Arc<StoreConnection> {
        &self.connection
    }

    /// Converts a database result, dropping the connection when the failure
    /// means the database went away.
    async fn check<T: Send>(&self, result: Result<T, DbErr>) -> Result<T, StoreError> {
        match result {
            Err(err) if is_connection_error(&err) => {
                tracing::error!("Lost the database connection: {}", err);
                self.connection.mark_disconnected().await;
                Err(StoreError::Unavailable)
            }
            other => other.map_err(StoreError::from),
        }
    }

    async fn find_existing(
        &self,
        db: &DatabaseConnection,
        id: &str,
    ) -> Result<task::Model, StoreError> {
        self.check(task::Entity::find_by_id(id.to_owned()).one(db).await)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_owned()))
    }
}

fn is_connection_error(err: &DbErr) -> bool {
    matches!(err, DbErr::Conn(_) | DbErr::ConnectionAcquire(_))
}

#[async_trait]
impl TaskStore for DatabaseTaskStore {
    async fn is_ready(&self) -> bool {
        self.connection.is_ready().await
    }

    async fn ensure_ready(&self) -> bool {
        self.connection.ensure_ready().await
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        let db = self.connection.handle().await?;
        let models = self
            .check(
                task::Entity::find()
                    .order_by_desc(task::Column::CreatedAt)
                    .all(&db)
                    .await,
            )
            .await?;
        Ok(models.into_iter().map(Task::from).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn create(&self, new_task: NewTask) -> Result<Task, StoreError> {
        let text = validate_text(new_task.text)?;
        let db = self.connection.handle().await?;
        let now = Utc::now();
        let active_model = task::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            text: ActiveValue::Set(text),
            completed: ActiveValue::Set(false),
            date: ActiveValue::Set(new_task.date.unwrap_or(now)),
            created_at: ActiveValue::Set(now),
        };
        let created_model = self.check(active_model.insert(&db).await).await?;
        Ok(Task::from(created_model))
    }

    #[tracing::instrument(skip(self))]
    async fn update(&self, id: &str, changes: TaskChanges) -> Result<Task, StoreError> {
        let db = self.connection.handle().await?;
        let existing = self.find_existing(&db, id).await?;
        let text = changes.text.map(validate_text).transpose()?;
        if text.is_none() && changes.completed.is_none() {
            return Ok(Task::from(existing));
        }

        let mut active_model: task::ActiveModel = existing.into();
        if let Some(text) = text {
            active_model.text = ActiveValue::Set(text);
        }
        if let Some(completed) = changes.completed {
            active_model.completed = ActiveValue::Set(completed);
        }
        let updated_model = self.check(active_model.update(&db).await).await?;
        Ok(Task::from(updated_model))
    }

    #[tracing::instrument(skip(self))]
    async fn delete_by_id(&self, id: &str) -> Result<Task, StoreError> {
        let db = self.connection.handle().await?;
        let existing = self.find_existing(&db, id).await?;
        let deleted = Task::from(existing);
        self.check(task::Entity::delete_by_id(id.to_owned()).exec(&db).await)
            .await?;
        Ok(deleted)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_all_completed(&self) -> Result<u64, StoreError> {
        let db = self.connection.handle().await?;
        let result = self
            .check(
                task::Entity::delete_many()
                    .filter(task::Column::Completed.eq(true))
                    .exec(&db)
                    .await,
            )
            .await?;
        Ok(result.rows_affected)
    }
}
