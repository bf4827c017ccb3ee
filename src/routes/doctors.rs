use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::doctors::{CreateDoctorRequest, DoctorList, SetAvailabilityRequest, UpdateDoctorRequest},
    error::AppResult,
    middleware::{auth::AuthUser, json::AppJson},
    models::DoctorProfile,
    response::ApiResponse,
    routes::params::DoctorQuery,
    services::doctor_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_doctors).post(create_doctor))
        .route(
            "/{id}",
            get(get_doctor).patch(update_doctor).delete(delete_doctor),
        )
        .route("/{id}/availability", patch(set_availability))
}

#[utoipa::path(
    get,
    path = "/api/doctors",
    params(DoctorQuery),
    responses(
        (status = 200, description = "Search doctors", body = ApiResponse<DoctorList>)
    ),
    tag = "Doctors"
)]
pub async fn list_doctors(
    State(state): State<AppState>,
    Query(query): Query<DoctorQuery>,
) -> AppResult<Json<ApiResponse<DoctorList>>> {
    let resp = doctor_service::list_doctors(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/doctors/{id}",
    params(("id" = Uuid, Path, description = "Doctor profile ID")),
    responses(
        (status = 200, description = "Doctor profile", body = ApiResponse<DoctorProfile>),
        (status = 404, description = "Not Found")
    ),
    tag = "Doctors"
)]
pub async fn get_doctor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<DoctorProfile>>> {
    let resp = doctor_service::get_doctor(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/doctors",
    request_body = CreateDoctorRequest,
    responses(
        (status = 201, description = "Create doctor profile (admin only)", body = ApiResponse<DoctorProfile>),
        (status = 400, description = "User missing or not a doctor"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Profile already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Doctors"
)]
pub async fn create_doctor(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateDoctorRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<DoctorProfile>>)> {
    let resp = doctor_service::create_doctor(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    patch,
    path = "/api/doctors/{id}",
    params(("id" = Uuid, Path, description = "Doctor profile ID")),
    request_body = UpdateDoctorRequest,
    responses(
        (status = 200, description = "Update doctor profile", body = ApiResponse<DoctorProfile>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Doctors"
)]
pub async fn update_doctor(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateDoctorRequest>,
) -> AppResult<Json<ApiResponse<DoctorProfile>>> {
    let resp = doctor_service::update_doctor(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/doctors/{id}",
    params(("id" = Uuid, Path, description = "Doctor profile ID")),
    responses(
        (status = 200, description = "Doctor, account and appointments deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Doctors"
)]
pub async fn delete_doctor(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let resp = doctor_service::delete_doctor(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/doctors/{id}/availability",
    params(("id" = Uuid, Path, description = "Doctor profile ID")),
    request_body = SetAvailabilityRequest,
    responses(
        (status = 200, description = "Publish slots for one date", body = ApiResponse<DoctorProfile>),
        (status = 400, description = "Invalid availability data"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Doctors"
)]
pub async fn set_availability(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<SetAvailabilityRequest>,
) -> AppResult<Json<ApiResponse<DoctorProfile>>> {
    let resp = doctor_service::set_availability(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
