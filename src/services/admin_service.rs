use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use sea_orm::ActiveValue::Set;
use uuid::Uuid;

use crate::{
    dto::{
        appointments::{AppointmentList, UpdateAppointmentStatusRequest},
        users::AdminSummary,
    },
    entity::{
        DoctorProfiles, Users,
        appointments::{
            ActiveModel as AppointmentActive, Column as AppointmentCol, Entity as Appointments,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Appointment, AppointmentStatus},
    policy::{self, Action, Resource},
    response::{ApiResponse, Meta},
    routes::params::AppointmentListQuery,
    services::mapping,
    state::AppState,
};

pub async fn summary(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<AdminSummary>> {
    policy::authorize(user, Resource::Summary, Action::List)?;

    let total_users = Users::find().count(&state.orm).await?;
    let total_doctors = DoctorProfiles::find().count(&state.orm).await?;
    let total_appointments = Appointments::find().count(&state.orm).await?;
    let pending_appointments = Appointments::find()
        .filter(AppointmentCol::Status.eq(AppointmentStatus::Pending.as_str()))
        .count(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Summary",
        AdminSummary {
            total_users,
            total_doctors,
            total_appointments,
            pending_appointments,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_all_appointments(
    state: &AppState,
    user: &AuthUser,
    query: AppointmentListQuery,
) -> AppResult<ApiResponse<AppointmentList>> {
    policy::authorize(user, Resource::Appointment, Action::List)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        let status = parse_status(status)?;
        condition = condition.add(AppointmentCol::Status.eq(status.as_str()));
    }

    let finder = Appointments::find()
        .filter(condition)
        .order_by_asc(AppointmentCol::Date)
        .order_by_asc(AppointmentCol::Time);

    let total = finder.clone().count(&state.orm).await? as i64;

    let appointments = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = mapping::attach_parties(&state.orm, appointments).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Appointments",
        AppointmentList { items },
        Some(meta),
    ))
}

/// Sets any valid status directly. No cancellation window, no slot re-check:
/// re-activating a cancelled appointment can overlap a newer booking.
pub async fn update_appointment_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateAppointmentStatusRequest,
) -> AppResult<ApiResponse<Appointment>> {
    policy::authorize(user, Resource::Appointment, Action::SetStatus)?;
    let status = parse_status(&payload.status)?;

    let existing = Appointments::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(a) => a,
        None => return Err(AppError::not_found("Appointment not found")),
    };

    let mut active: AppointmentActive = existing.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let appointment = active.update(&state.orm).await?;

    tracing::info!(
        appointment_id = %appointment.id,
        status = %appointment.status,
        "appointment status set by admin"
    );

    Ok(ApiResponse::success(
        "Appointment status updated successfully",
        mapping::appointment_from_entity(appointment)?,
        Some(Meta::empty()),
    ))
}

pub async fn delete_appointment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<()>> {
    policy::authorize(user, Resource::Appointment, Action::Delete)?;

    let result = Appointments::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Appointment not found"));
    }

    tracing::info!(appointment_id = %id, "appointment deleted by admin");
    Ok(ApiResponse::message_only("Appointment deleted successfully"))
}

fn parse_status(status: &str) -> AppResult<AppointmentStatus> {
    status
        .trim()
        .parse::<AppointmentStatus>()
        .map_err(|_| AppError::bad_request("Invalid or missing appointment status"))
}
