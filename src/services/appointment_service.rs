use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    booking::{self, BookingRejection},
    dto::appointments::{AppointmentList, BookAppointmentRequest},
    entity::{
        appointments::{
            ActiveModel as AppointmentActive, Column as AppointmentCol, Entity as Appointments,
        },
        availability_entries::{Column as AvailCol, Entity as AvailabilityEntries},
        doctor_profiles::{Column as DoctorCol, Entity as DoctorProfiles},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Appointment, AppointmentStatus, AvailabilityEntry, Role},
    policy::{self, Action, Resource},
    response::{ApiResponse, Meta},
    services::mapping,
    state::AppState,
};

pub async fn book_appointment(
    state: &AppState,
    user: &AuthUser,
    payload: BookAppointmentRequest,
) -> AppResult<ApiResponse<Appointment>> {
    book_appointment_at(state, user, payload, Utc::now()).await
}

/// Conflict-checked booking evaluated against `now`.
///
/// The doctor's profile row is locked for the whole transaction, so two
/// requests for the same doctor cannot both pass the "already booked" check
/// before one of them commits.
pub async fn book_appointment_at(
    state: &AppState,
    user: &AuthUser,
    payload: BookAppointmentRequest,
    now: DateTime<Utc>,
) -> AppResult<ApiResponse<Appointment>> {
    let time = payload.time.trim().to_string();
    if time.is_empty() {
        return Err(AppError::bad_request(
            "Missing required fields: doctor_id, date, time",
        ));
    }
    if payload.duration_minutes.is_some_and(|minutes| minutes <= 0) {
        return Err(AppError::bad_request("duration_minutes must be positive"));
    }

    let txn = state.orm.begin().await?;

    let doctor = DoctorProfiles::find()
        .filter(DoctorCol::UserId.eq(payload.doctor_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let doctor = match doctor {
        Some(d) => d,
        None => {
            tracing::info!(doctor_user_id = %payload.doctor_id, "doctor profile not found");
            return Err(AppError::not_found("Doctor not found"));
        }
    };

    policy::authorize(user, Resource::Appointment, Action::Book)?;
    booking::check_booking_window(payload.date, now.date_naive())?;

    let availability = AvailabilityEntries::find()
        .filter(AvailCol::DoctorId.eq(doctor.id))
        .filter(AvailCol::Date.eq(payload.date))
        .all(&txn)
        .await?
        .into_iter()
        .map(mapping::availability_from_entity)
        .collect::<AppResult<Vec<AvailabilityEntry>>>()?;
    if let Err(rejection) = booking::ensure_slot_published(&availability, payload.date, &time) {
        tracing::info!(doctor_id = %doctor.id, date = %payload.date, %time, "slot not published");
        return Err(rejection.into());
    }

    let taken = Appointments::find()
        .filter(
            Condition::all()
                .add(AppointmentCol::DoctorId.eq(doctor.id))
                .add(AppointmentCol::Date.eq(payload.date))
                .add(AppointmentCol::Time.eq(time.as_str()))
                .add(AppointmentCol::Status.ne(AppointmentStatus::Cancelled.as_str())),
        )
        .one(&txn)
        .await?;
    if taken.is_some() {
        tracing::info!(doctor_id = %doctor.id, date = %payload.date, %time, "slot already booked");
        return Err(BookingRejection::SlotTaken.into());
    }

    let appointment = AppointmentActive {
        id: Set(Uuid::new_v4()),
        doctor_id: Set(doctor.id),
        patient_id: Set(user.user_id),
        date: Set(payload.date),
        time: Set(time),
        duration_minutes: Set(payload.duration_minutes),
        status: Set(AppointmentStatus::Booked.as_str().to_string()),
        notes: Set(payload.notes),
        symptoms: Set(payload.symptoms),
        signs: Set(payload.signs),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        appointment_id = %appointment.id,
        doctor_id = %appointment.doctor_id,
        patient_id = %appointment.patient_id,
        "appointment booked"
    );

    Ok(ApiResponse::success(
        "Appointment booked",
        mapping::appointment_from_entity(appointment)?,
        Some(Meta::empty()),
    ))
}

/// Appointments of the caller: a patient's bookings or a doctor's schedule.
pub async fn list_my_appointments(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AppointmentList>> {
    let condition = own_appointments(state, user).await?;
    fetch_sorted(state, condition, "Appointments").await
}

/// Like [`list_my_appointments`], restricted to non-cancelled ones from today on.
pub async fn list_upcoming_appointments(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AppointmentList>> {
    let today = Utc::now().date_naive();
    let condition = own_appointments(state, user)
        .await?
        .add(AppointmentCol::Date.gte(today))
        .add(AppointmentCol::Status.ne(AppointmentStatus::Cancelled.as_str()));
    fetch_sorted(state, condition, "Upcoming appointments").await
}

pub async fn cancel_appointment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Appointment>> {
    cancel_appointment_at(state, user, id, Utc::now()).await
}

pub async fn cancel_appointment_at(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<ApiResponse<Appointment>> {
    let txn = state.orm.begin().await?;

    let appointment = Appointments::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Appointment not found"))?;

    policy::authorize(user, Resource::Appointment, Action::Cancel)?;
    let is_party = match user.role {
        Role::Admin => true,
        Role::Patient => appointment.patient_id == user.user_id,
        Role::Doctor => DoctorProfiles::find()
            .filter(DoctorCol::UserId.eq(user.user_id))
            .one(&txn)
            .await?
            .is_some_and(|doctor| doctor.id == appointment.doctor_id),
    };
    if !is_party {
        return Err(AppError::forbidden("Unauthorized to cancel this appointment"));
    }

    let current = mapping::appointment_from_entity(appointment.clone())?;
    booking::ensure_cancellable(current.status, current.date, &current.time, now)?;

    let mut active: AppointmentActive = appointment.into();
    active.status = Set(AppointmentStatus::Cancelled.as_str().to_string());
    active.updated_at = Set(now.into());
    let appointment = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(appointment_id = %appointment.id, by = %user.user_id, "appointment cancelled");
    Ok(ApiResponse::success(
        "Appointment cancelled successfully",
        mapping::appointment_from_entity(appointment)?,
        Some(Meta::empty()),
    ))
}

async fn own_appointments(state: &AppState, user: &AuthUser) -> AppResult<Condition> {
    policy::authorize(user, Resource::Appointment, Action::ListOwn)?;
    match user.role {
        Role::Doctor => {
            let doctor = DoctorProfiles::find()
                .filter(DoctorCol::UserId.eq(user.user_id))
                .one(&state.orm)
                .await?
                .ok_or_else(|| AppError::not_found("Doctor profile not found for this user ID"))?;
            Ok(Condition::all().add(AppointmentCol::DoctorId.eq(doctor.id)))
        }
        _ => Ok(Condition::all().add(AppointmentCol::PatientId.eq(user.user_id))),
    }
}

async fn fetch_sorted(
    state: &AppState,
    condition: Condition,
    message: &str,
) -> AppResult<ApiResponse<AppointmentList>> {
    let appointments = Appointments::find()
        .filter(condition)
        .order_by_asc(AppointmentCol::Date)
        .order_by_asc(AppointmentCol::Time)
        .all(&state.orm)
        .await?;
    let total = appointments.len() as i64;
    let items = mapping::attach_parties(&state.orm, appointments).await?;

    Ok(ApiResponse::success(
        message,
        AppointmentList { items },
        Some(Meta::new(1, total, total)),
    ))
}
