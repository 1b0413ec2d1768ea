//! HTTP boundary: routing, state, and error mapping.
//!
//! The boundary translates domain error codes into transport status codes;
//! the core never sees HTTP concerns.

pub mod auth;
pub mod tasks;

use crate::auth::{AuthService, TokenService};
use crate::error::{ApiError, ErrorKind};
use crate::service::TaskService;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, patch, post, put};
use axum::{middleware, Router};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct ApiContext {
    pub service: TaskService,
    pub auth: AuthService,
    pub tokens: TokenService,
    pub default_page_size: u32,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.code.kind() {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Health check response.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the application router.
///
/// Task routes sit behind the bearer-token middleware; auth routes and the
/// health check do not.
pub fn build_router(ctx: ApiContext) -> Router {
    let task_routes = Router::new()
        .route("/v1/tasks", post(tasks::create_task).get(tasks::list_tasks))
        .route(
            "/v1/tasks/{parent_id}/subtasks",
            post(tasks::create_subtask),
        )
        .route("/v1/tasks/{id}/status", patch(tasks::update_status))
        .route(
            "/v1/tasks/{id}",
            put(tasks::update_task).delete(tasks::delete_task),
        )
        .route_layer(middleware::from_fn_with_state(
            ctx.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/v1/auth/register", post(auth::register))
        .route("/v1/auth/login", post(auth::login))
        .route("/health", get(health))
        .merge(task_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(ctx)
}

/// Bind and serve until the process is stopped.
pub async fn serve(ctx: ApiContext, bind: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("todo-api listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(ctx)).await?;
    Ok(())
}
