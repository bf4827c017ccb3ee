use std::sync::Arc;

use axum::{
    Json, Router, extract::State, http::StatusCode, middleware::from_fn_with_state,
    routing::post,
};

use crate::{
    dto::auth::{AuthResponse, LoginRequest, RegisterRequest},
    error::AppResult,
    middleware::{
        json::AppJson,
        rate_limit::{self, AUTH_WINDOW, LOGIN_MAX_FAILURES, REGISTER_MAX_REQUESTS, RateLimiter},
    },
    response::ApiResponse,
    services::auth_service::{login_user, register_user},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    let register_limit = Arc::new(RateLimiter::new(REGISTER_MAX_REQUESTS, AUTH_WINDOW));
    let login_limit = Arc::new(RateLimiter::new(LOGIN_MAX_FAILURES, AUTH_WINDOW).skip_successful());

    Router::new()
        .route(
            "/register",
            post(register).layer(from_fn_with_state(register_limit, rate_limit::enforce)),
        )
        .route(
            "/login",
            post(login).layer(from_fn_with_state(login_limit, rate_limit::enforce)),
        )
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register user", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Username or email already exists"),
        (status = 429, description = "Too many registration attempts")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthResponse>>)> {
    let resp = register_user(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many failed login attempts")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    let resp = login_user(&state, payload).await?;
    Ok(Json(resp))
}
