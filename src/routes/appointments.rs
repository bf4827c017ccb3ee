use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::appointments::{AppointmentList, BookAppointmentRequest},
    error::AppResult,
    middleware::{auth::AuthUser, json::AppJson},
    models::Appointment,
    response::ApiResponse,
    services::appointment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_appointments).post(book_appointment))
        .route("/upcoming", get(list_upcoming))
        .route("/{id}/cancel", patch(cancel_appointment))
}

#[utoipa::path(
    post,
    path = "/api/appointments",
    request_body = BookAppointmentRequest,
    responses(
        (status = 201, description = "Appointment booked", body = ApiResponse<Appointment>),
        (status = 400, description = "Date in the past, too far ahead, or missing fields"),
        (status = 403, description = "Only patients can book"),
        (status = 404, description = "Doctor not found"),
        (status = 409, description = "Slot not available or already booked")
    ),
    security(("bearer_auth" = [])),
    tag = "Appointments"
)]
pub async fn book_appointment(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<BookAppointmentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Appointment>>)> {
    let resp = appointment_service::book_appointment(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/appointments",
    responses(
        (status = 200, description = "Own appointments sorted by date and time", body = ApiResponse<AppointmentList>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Doctor profile not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Appointments"
)]
pub async fn list_appointments(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<AppointmentList>>> {
    let resp = appointment_service::list_my_appointments(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/appointments/upcoming",
    responses(
        (status = 200, description = "Own non-cancelled appointments from today on", body = ApiResponse<AppointmentList>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Doctor profile not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Appointments"
)]
pub async fn list_upcoming(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<AppointmentList>>> {
    let resp = appointment_service::list_upcoming_appointments(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/appointments/{id}/cancel",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment cancelled", body = ApiResponse<Appointment>),
        (status = 400, description = "Already cancelled or inside the 24 hour window"),
        (status = 403, description = "Not a party to the appointment"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Appointments"
)]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Appointment>>> {
    let resp = appointment_service::cancel_appointment(&state, &user, id).await?;
    Ok(Json(resp))
}
