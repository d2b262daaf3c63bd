use axum::extract::State;
use axum::http::{Method, header};
use axum::response::Json;
use axum::{Router, routing::get};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::config::Config;
use crate::store::{
    ConnectionState, DatabaseConnector, DatabaseTaskStore, StoreConnection, TaskStore,
};
use crate::task::api::{TaskState, TasksApiDoc, create_api_router};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn TaskStore>,
}

/// Runtime details reported by the health endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthEnv {
    pub mode: String,
    pub port: u16,
}

/// JSON response for GET /api/health.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub store_connection_state: ConnectionState,
    pub timestamp: DateTime<Utc>,
    pub env: HealthEnv,
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let connection = Arc::new(StoreConnection::new(
        DatabaseConnector::new(config.database_url.clone()),
        config.connection_settings(),
    ));

    // Requests are served while the initial connection is still being made.
    let initial_connection = Arc::clone(&connection);
    tokio::spawn(async move {
        initial_connection.connect().await;
    });
    connection.spawn_monitor(config.monitor_interval());

    let state = AppState {
        config: Arc::new(config),
        store: Arc::new(DatabaseTaskStore::new(connection)),
    };

    axum::serve(listener, create_app(state)).await?;
    Ok(())
}

/// Builds the full application: the JSON API under `/api` and the front end
/// for every other path.
pub fn create_app(state: AppState) -> Router {
    let task_state = TaskState {
        store: state.store.clone(),
    };
    let static_dir = PathBuf::from(&state.config.static_dir);
    let front_end =
        ServeDir::new(&static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    let api_routes = Router::new()
        .route("/health", get(health_check_handler))
        .route("/openapi.json", get(openapi_handler))
        .with_state(state)
        .merge(create_api_router(task_state));

    Router::new()
        .nest("/api", api_routes)
        .fallback_service(front_end)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer()),
        )
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

#[tracing::instrument(skip(state))]
pub async fn health_check_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let health = HealthResponse {
        status: "ok".to_string(),
        store_connection_state: ConnectionState::from(state.store.is_ready().await),
        timestamp: Utc::now(),
        env: HealthEnv {
            mode: state.config.run_mode.clone(),
            port: state.config.port,
        },
    };
    tracing::debug!("Health check: {:?}", health);
    Json(health)
}

pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(TasksApiDoc::openapi())
}
