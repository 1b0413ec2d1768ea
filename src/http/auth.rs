//! Auth endpoints and the bearer-token middleware.
//!
//! Every task route requires `Authorization: Bearer <token>`. The
//! middleware resolves the token to a caller user id and stashes it in
//! request extensions; handlers never touch credentials.

use super::ApiContext;
use crate::error::ApiError;
use crate::types::{Role, User, UserId};
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

/// Authenticated caller, inserted by [`require_auth`].
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub UserId);

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// `POST /v1/auth/register`
pub async fn register(
    State(ctx): State<ApiContext>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = ctx.auth.register(&req.login, &req.password, req.role)?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /v1/auth/login`
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let token = ctx.auth.login(&req.login, &req.password)?;
    Ok(Json(LoginResponse { token }))
}

/// Middleware guarding the task routes.
pub async fn require_auth(State(ctx): State<ApiContext>, mut req: Request, next: Next) -> Response {
    let verified = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| ctx.tokens.verify(token));

    match verified {
        Some(Ok(user_id)) => {
            req.extensions_mut().insert(Caller(user_id));
            next.run(req).await
        }
        _ => ApiError::invalid_credentials().into_response(),
    }
}
