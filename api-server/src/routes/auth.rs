//! Auth API endpoints
//!
//! Registration, login, and the current-user lookup. Token issuance lives
//! in the user store; handlers only shape requests and responses.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use td_core::principal::Role;

use crate::auth::{self, AuthError, UserSummary};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type RouteError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    email: String,
    password: String,
    #[serde(default)]
    role: Option<Role>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    token: String,
    expires_at: String,
    user: UserSummary,
}

pub fn route_error(status: StatusCode, error: impl Into<String>) -> RouteError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

pub fn map_auth_error(err: AuthError) -> RouteError {
    let status = match &err {
        AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        AuthError::NotFound(_) => StatusCode::NOT_FOUND,
        AuthError::Conflict(_) => StatusCode::CONFLICT,
        AuthError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    route_error(status, err.to_string())
}

fn format_expiry(exp: usize) -> String {
    DateTime::<Utc>::from_timestamp(exp as i64, 0)
        .map(|value| value.to_rfc3339())
        .unwrap_or_else(|| Utc::now().to_rfc3339())
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), RouteError> {
    let role = req.role.unwrap_or_default();
    state
        .user_store()
        .register(&req.email, &req.password, role)
        .await
        .map_err(map_auth_error)?;

    let session = state
        .user_store()
        .login(&req.email, &req.password)
        .await
        .map_err(map_auth_error)?;
    let token = state
        .user_store()
        .encode_claims(&session.claims)
        .map_err(map_auth_error)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            expires_at: format_expiry(session.claims.exp),
            user: session.user,
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, RouteError> {
    let session = state
        .user_store()
        .login(&req.email, &req.password)
        .await
        .map_err(map_auth_error)?;
    let token = state
        .user_store()
        .encode_claims(&session.claims)
        .map_err(map_auth_error)?;

    Ok(Json(AuthResponse {
        token,
        expires_at: format_expiry(session.claims.exp),
        user: session.user,
    }))
}

async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserSummary>, RouteError> {
    let principal = auth::resolve_principal(state.user_store(), &headers)
        .await
        .map_err(map_auth_error)?;
    let user = state
        .user_store()
        .get(principal.id)
        .await
        .map_err(map_auth_error)?;
    Ok(Json(user))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use td_core::task::InMemoryTaskStore;

    use crate::auth::UserStore;
    use crate::state::AppState;

    async fn build_state() -> (AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let users = UserStore::new(temp_dir.path().join("auth")).await.unwrap();
        let state = AppState::with_stores(Arc::new(InMemoryTaskStore::new()), users);
        (state, temp_dir)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn register_then_me_roundtrip() {
        let (state, _temp_dir) = build_state().await;
        let app = super::router().with_state(state);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                json!({"email": "alice@example.com", "password": "verysecurepw"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: Value = serde_json::from_slice(&body).unwrap();
        let token = payload["token"].as_str().unwrap().to_string();
        assert_eq!(payload["user"]["role"], "user");

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/auth/me")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["email"], "alice@example.com");
    }

    #[tokio::test]
    async fn login_with_bad_password_is_unauthorized() {
        let (state, _temp_dir) = build_state().await;
        let app = super::router().with_state(state);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                json!({"email": "alice@example.com", "password": "verysecurepw"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                json!({"email": "alice@example.com", "password": "wrongpassword"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
