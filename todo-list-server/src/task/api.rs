use axum::{
    Json, Router,
    extract::{Path, Request, State, rejection::JsonRejection},
    http::StatusCode,
    middleware::{Next, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{delete, get, patch},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::store::{StoreError, TaskStore};
use crate::task::{NewTask, Task, TaskChanges};

#[derive(Clone)]
pub struct TaskState {
    pub store: Arc<dyn TaskStore>,
}

/// JSON representation of a Task for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskJson {
    /// Unique identifier assigned by the store
    pub id: String,
    /// What needs doing
    pub text: String,
    /// Whether the task is done
    pub completed: bool,
    /// When the task is scheduled
    pub date: DateTime<Utc>,
    /// When the task was created
    pub created_at: DateTime<Utc>,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id().to_string(),
            text: task.text().to_string(),
            completed: task.completed(),
            date: task.date(),
            created_at: task.created_at(),
        }
    }
}

/// Request body for creating a task.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    /// Required, must not be empty
    #[serde(default)]
    pub text: Option<String>,
    /// Defaults to the creation time
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// Request body for a partial task update.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

/// JSON body carrying a human readable message.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response for clearing completed tasks.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClearCompletedResponse {
    pub message: String,
    /// Number of tasks deleted
    pub count: u64,
}

/// Error type for task API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request is missing a required field or is malformed.
    #[error("{0}")]
    Validation(String),
    /// The addressed task does not exist.
    #[error("Task not found")]
    NotFound,
    /// The database connection could not be established.
    #[error("Database connection not ready")]
    Unavailable,
    /// Anything else.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(message) => ApiError::Validation(message),
            StoreError::NotFound(_) => ApiError::NotFound,
            StoreError::Unavailable => ApiError::Unavailable,
            StoreError::Database(err) => ApiError::Unexpected(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let user_facing_error_message = match self {
            ApiError::Unexpected(detail) => {
                tracing::error!("Unexpected error while handling request: {}", detail);
                "An unexpected error occurred while processing your request. Please try again later."
                    .to_string()
            }
            other => other.to_string(),
        };
        (
            status_code,
            Json(MessageResponse::new(user_facing_error_message)),
        )
            .into_response()
    }
}

/// Middleware that rejects requests with 503 unless the store is, or can be
/// brought back, online.
pub async fn require_store_middleware(
    State(state): State<TaskState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.store.ensure_ready().await {
        tracing::error!("Database connection failed after retry");
        return ApiError::Unavailable.into_response();
    }

    next.run(request).await
}

/// Handler for GET /api/tasks - Returns all tasks, newest first.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks",
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = [TaskJson]),
        (status = 503, description = "Database unavailable", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<TaskState>,
) -> Result<Json<Vec<TaskJson>>, ApiError> {
    let tasks = state.store.list().await?;
    tracing::info!("Found {} tasks", tasks.len());
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Handler for POST /api/tasks - Creates a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskJson),
        (status = 400, description = "Task text is missing", body = MessageResponse),
        (status = 503, description = "Database unavailable", body = MessageResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<TaskState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskJson>), ApiError> {
    let Json(payload) = payload?;
    let text = payload
        .text
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ApiError::Validation("Task text is required".to_string()))?;

    let task = state
        .store
        .create(NewTask {
            text,
            date: payload.date,
        })
        .await?;
    tracing::info!(task_id = task.id(), "Task created");
    Ok((StatusCode::CREATED, Json(TaskJson::from(task))))
}

/// Handler for PATCH /api/tasks/{id} - Updates the supplied fields of a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    patch,
    path = "/api/tasks/{id}",
    params(("id" = String, Path, description = "Task identifier")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskJson),
        (status = 400, description = "Invalid update", body = MessageResponse),
        (status = 404, description = "Task not found", body = MessageResponse),
        (status = 503, description = "Database unavailable", body = MessageResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<TaskState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<TaskJson>, ApiError> {
    let Json(payload) = payload?;
    let changes = TaskChanges {
        text: payload.text,
        completed: payload.completed,
    };

    let task = state.store.update(&id, changes).await?;
    tracing::info!(
        task_id = task.id(),
        completed = task.completed(),
        "Task updated"
    );
    Ok(Json(TaskJson::from(task)))
}

/// Handler for DELETE /api/tasks/{id} - Deletes a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(("id" = String, Path, description = "Task identifier")),
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 404, description = "Task not found", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<TaskState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let task = state.store.delete_by_id(&id).await?;
    tracing::info!(task_id = task.id(), "Task deleted");
    Ok(Json(MessageResponse::new("Task deleted")))
}

/// Handler for DELETE /api/tasks/completed/all - Deletes every completed task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/tasks/completed/all",
    responses(
        (status = 200, description = "Completed tasks deleted", body = ClearCompletedResponse),
        (status = 503, description = "Database unavailable", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    tag = "Tasks"
)]
pub async fn clear_completed_handler(
    State(state): State<TaskState>,
) -> Result<Json<ClearCompletedResponse>, ApiError> {
    let count = state.store.delete_all_completed().await?;
    tracing::info!("Deleted {} completed tasks", count);
    Ok(Json(ClearCompletedResponse {
        message: "All completed tasks deleted".to_string(),
        count,
    }))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list_tasks_handler,
        create_task_handler,
        update_task_handler,
        delete_task_handler,
        clear_completed_handler
    ),
    components(schemas(
        TaskJson,
        CreateTaskRequest,
        UpdateTaskRequest,
        MessageResponse,
        ClearCompletedResponse
    )),
    tags((name = "Tasks", description = "To-do task management"))
)]
pub struct TasksApiDoc;

/// Creates and returns the tasks API router. Every route is guarded by
/// [`require_store_middleware`].
pub fn create_api_router(state: TaskState) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks_handler).post(create_task_handler))
        .route("/tasks/completed/all", delete(clear_completed_handler))
        .route(
            "/tasks/{id}",
            patch(update_task_handler).delete(delete_task_handler),
        )
        .route_layer(from_fn_with_state(state.clone(), require_store_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockTaskStore;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use chrono::TimeZone;
    use mockall::predicate::*;
    use tower::ServiceExt;

    fn sample_task(id: &str, text: &str, completed: bool) -> Task {
        let created_at = Utc.with_ymd_and_hms(2025, 1, 2, 9, 0, 0).unwrap();
        Task::new(
            id.to_string(),
            text.to_string(),
            completed,
            created_at,
            created_at,
        )
    }

    fn ready_store() -> MockTaskStore {
        let mut store = MockTaskStore::new();
        store.expect_ensure_ready().returning(|| true);
        store
    }

    fn router(store: MockTaskStore) -> Router {
        create_api_router(TaskState {
            store: Arc::new(store),
        })
    }

    fn json_request(method: Method, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn can_list_tasks() {
        let mut store = ready_store();
        store.expect_list().times(1).returning(|| {
            Ok(vec![
                sample_task("b", "second", false),
                sample_task("a", "first", true),
            ])
        });

        let response = router(store)
            .oneshot(empty_request(Method::GET, "/tasks"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body[0]["id"], "b");
        assert_eq!(body[1]["completed"], true);
        assert_eq!(body[0]["createdAt"], "2025-01-02T09:00:00Z");
    }

    #[tokio::test]
    async fn can_reject_requests_when_store_stays_unavailable() {
        let mut store = MockTaskStore::new();
        store.expect_ensure_ready().times(1).returning(|| false);
        store.expect_list().never();

        let response = router(store)
            .oneshot(empty_request(Method::GET, "/tasks"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Database connection not ready");
    }

    #[tokio::test]
    async fn can_create_task() {
        let mut store = ready_store();
        store
            .expect_create()
            .with(eq(NewTask {
                text: "buy milk".to_string(),
                date: None,
            }))
            .times(1)
            .returning(|new_task| Ok(sample_task("new-id", &new_task.text, false)));

        let response = router(store)
            .oneshot(json_request(
                Method::POST,
                "/tasks",
                r#"{"text":"buy milk"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["id"], "new-id");
        assert_eq!(body["text"], "buy milk");
        assert_eq!(body["completed"], false);
    }

    #[tokio::test]
    async fn can_pass_supplied_date_to_store() {
        let date = Utc.with_ymd_and_hms(2025, 3, 4, 15, 30, 0).unwrap();
        let mut store = ready_store();
        store
            .expect_create()
            .with(eq(NewTask {
                text: "dentist".to_string(),
                date: Some(date),
            }))
            .times(1)
            .returning(|new_task| Ok(sample_task("id", &new_task.text, false)));

        let response = router(store)
            .oneshot(json_request(
                Method::POST,
                "/tasks",
                r#"{"text":"dentist","date":"2025-03-04T15:30:00Z"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn can_reject_task_without_text() {
        let mut store = ready_store();
        store.expect_create().never();

        let response = router(store)
            .oneshot(json_request(Method::POST, "/tasks", "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Task text is required");
    }

    #[tokio::test]
    async fn can_reject_task_with_empty_text() {
        let mut store = ready_store();
        store.expect_create().never();

        let response = router(store)
            .oneshot(json_request(Method::POST, "/tasks", r#"{"text":""}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn can_reject_malformed_json_with_bad_request() {
        let mut store = ready_store();
        store.expect_create().never();

        let response = router(store)
            .oneshot(json_request(Method::POST, "/tasks", r#"{"text":"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn can_update_task_completion() {
        let mut store = ready_store();
        store
            .expect_update()
            .with(
                eq("task-1"),
                eq(TaskChanges {
                    text: None,
                    completed: Some(true),
                }),
            )
            .times(1)
            .returning(|id, _| Ok(sample_task(id, "buy milk", true)));

        let response = router(store)
            .oneshot(json_request(
                Method::PATCH,
                "/tasks/task-1",
                r#"{"completed":true}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["completed"], true);
        assert_eq!(body["text"], "buy milk");
    }

    #[tokio::test]
    async fn can_return_not_found_when_updating_missing_task() {
        let mut store = ready_store();
        store
            .expect_update()
            .returning(|id, _| Err(StoreError::NotFound(id.to_string())));

        let response = router(store)
            .oneshot(json_request(
                Method::PATCH,
                "/tasks/missing",
                r#"{"completed":true}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Task not found");
    }

    #[tokio::test]
    async fn can_reject_update_to_blank_text() {
        let mut store = ready_store();
        store.expect_update().returning(|_, _| {
            Err(StoreError::Validation("Task text is required".to_string()))
        });

        let response = router(store)
            .oneshot(json_request(
                Method::PATCH,
                "/tasks/task-1",
                r#"{"text":"  "}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn can_delete_task() {
        let mut store = ready_store();
        store
            .expect_delete_by_id()
            .with(eq("task-1"))
            .times(1)
            .returning(|id| Ok(sample_task(id, "buy milk", false)));

        let response = router(store)
            .oneshot(empty_request(Method::DELETE, "/tasks/task-1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Task deleted");
    }

    #[tokio::test]
    async fn can_return_not_found_when_deleting_missing_task() {
        let mut store = ready_store();
        store
            .expect_delete_by_id()
            .returning(|id| Err(StoreError::NotFound(id.to_string())));

        let response = router(store)
            .oneshot(empty_request(Method::DELETE, "/tasks/missing"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn can_hide_database_errors_behind_internal_server_error() {
        let mut store = ready_store();
        store.expect_delete_by_id().returning(|_| {
            Err(StoreError::Database(sea_orm::DbErr::Custom(
                "disk full".to_string(),
            )))
        });

        let response = router(store)
            .oneshot(empty_request(Method::DELETE, "/tasks/task-1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(
            body["message"],
            "An unexpected error occurred while processing your request. Please try again later."
        );
    }

    #[tokio::test]
    async fn can_report_connection_lost_mid_request_as_unavailable() {
        let mut store = ready_store();
        store
            .expect_list()
            .returning(|| Err(StoreError::Unavailable));

        let response = router(store)
            .oneshot(empty_request(Method::GET, "/tasks"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn can_clear_completed_tasks() {
        let mut store = ready_store();
        store
            .expect_delete_all_completed()
            .times(1)
            .returning(|| Ok(2));

        let response = router(store)
            .oneshot(empty_request(Method::DELETE, "/tasks/completed/all"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "All completed tasks deleted");
        assert_eq!(body["count"], 2);
    }

    #[test]
    fn can_document_every_task_route() {
        let doc = TasksApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/tasks"));
        assert!(doc.paths.paths.contains_key("/api/tasks/{id}"));
        assert!(doc.paths.paths.contains_key("/api/tasks/completed/all"));
    }
}
