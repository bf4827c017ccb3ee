use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod appointments;
pub mod auth;
pub mod doc;
pub mod doctors;
pub mod health;
pub mod params;
pub mod users;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/doctors", doctors::router())
        .nest("/appointments", appointments::router())
        .nest("/users", users::router())
        .nest("/admin", admin::router())
}
