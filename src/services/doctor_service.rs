use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    booking::normalize_slots,
    dto::doctors::{
        CreateDoctorRequest, DoctorList, DoctorListing, SetAvailabilityRequest,
        UpdateDoctorRequest,
    },
    entity::{
        appointments::{Column as AppointmentCol, Entity as Appointments},
        availability_entries::{
            ActiveModel as AvailActive, Column as AvailCol, Entity as AvailabilityEntries,
        },
        doctor_profiles::{
            ActiveModel as DoctorActive, Column as DoctorCol, Entity as DoctorProfiles,
            Model as DoctorModel,
        },
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{AvailabilityEntry, DoctorProfile, Role, UserSummary},
    policy::{self, Action, Resource},
    response::{ApiResponse, Meta},
    routes::params::{DoctorQuery, contains_pattern},
    services::{auth_service::non_blank, mapping},
    state::AppState,
};

#[derive(Debug, sqlx::FromRow)]
struct DoctorRow {
    id: Uuid,
    specialization: String,
    user_id: Uuid,
    username: String,
    email: String,
    name: Option<String>,
    image: Option<String>,
    location: Option<String>,
}

pub async fn list_doctors(
    state: &AppState,
    query: DoctorQuery,
) -> AppResult<ApiResponse<DoctorList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let specialization = non_blank(query.specialization).map(|s| contains_pattern(&s));
    let search = non_blank(query.search).map(|s| contains_pattern(&s));

    let rows: Vec<DoctorRow> = sqlx::query_as(
        r#"
        SELECT d.id, d.specialization, u.id AS user_id, u.username, u.email,
               u.name, u.image, u.location
        FROM doctor_profiles d
        JOIN users u ON u.id = d.user_id
        WHERE ($1::text IS NULL OR d.specialization ILIKE $1)
          AND ($2::text IS NULL OR u.username ILIKE $2 OR u.name ILIKE $2)
        ORDER BY u.name NULLS LAST, u.username
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(specialization.as_deref())
    .bind(search.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT count(*)
        FROM doctor_profiles d
        JOIN users u ON u.id = d.user_id
        WHERE ($1::text IS NULL OR d.specialization ILIKE $1)
          AND ($2::text IS NULL OR u.username ILIKE $2 OR u.name ILIKE $2)
        "#,
    )
    .bind(specialization.as_deref())
    .bind(search.as_deref())
    .fetch_one(&state.pool)
    .await?;

    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let mut schedules: HashMap<Uuid, Vec<AvailabilityEntry>> = HashMap::new();
    if !ids.is_empty() {
        let entries = AvailabilityEntries::find()
            .filter(AvailCol::DoctorId.is_in(ids))
            .order_by_asc(AvailCol::Date)
            .all(&state.orm)
            .await?;
        for entry in entries {
            let doctor_id = entry.doctor_id;
            schedules
                .entry(doctor_id)
                .or_default()
                .push(mapping::availability_from_entity(entry)?);
        }
    }

    let items = rows
        .into_iter()
        .map(|row| DoctorListing {
            availability: schedules.remove(&row.id).unwrap_or_default(),
            id: row.id,
            specialization: row.specialization,
            user: UserSummary {
                id: row.user_id,
                username: row.username,
                email: row.email,
                name: row.name,
                image: row.image,
                location: row.location,
            },
        })
        .collect();

    Ok(ApiResponse::success(
        "Doctors",
        DoctorList { items },
        Some(Meta::new(page, limit, total.0)),
    ))
}

pub async fn get_doctor(state: &AppState, id: Uuid) -> AppResult<ApiResponse<DoctorProfile>> {
    let doctor = find_profile(&state.orm, id).await?;
    let profile = mapping::load_doctor_profile(&state.orm, doctor).await?;
    Ok(ApiResponse::success("Doctor found", profile, Some(Meta::empty())))
}

pub async fn create_doctor(
    state: &AppState,
    user: &AuthUser,
    payload: CreateDoctorRequest,
) -> AppResult<ApiResponse<DoctorProfile>> {
    policy::authorize(user, Resource::Doctor, Action::Create)?;
    let specialization = non_blank(Some(payload.specialization))
        .ok_or_else(|| AppError::bad_request("missing required fields: user_id, specialization"))?;
    let availability = normalize_schedule(payload.availability)?;

    let account = Users::find_by_id(payload.user_id).one(&state.orm).await?;
    match account {
        Some(account) if account.role == Role::Doctor.as_str() => {}
        _ => {
            return Err(AppError::bad_request(
                "Invalid user_id or user is not a doctor",
            ));
        }
    }

    let existing = DoctorProfiles::find()
        .filter(DoctorCol::UserId.eq(payload.user_id))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::conflict(
            "Doctor profile already exists for this user",
        ));
    }

    let txn = state.orm.begin().await?;
    let doctor = DoctorActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(payload.user_id),
        specialization: Set(specialization),
        created_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|e| AppError::from(e).or_conflict("Doctor profile already exists for this user"))?;

    insert_schedule(&txn, doctor.id, &availability).await?;
    txn.commit().await?;

    tracing::info!(doctor_id = %doctor.id, user_id = %doctor.user_id, "doctor profile created");
    let profile = mapping::doctor_from_entity(doctor, availability);
    Ok(ApiResponse::success("Doctor created", profile, Some(Meta::empty())))
}

pub async fn update_doctor(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateDoctorRequest,
) -> AppResult<ApiResponse<DoctorProfile>> {
    policy::authorize(user, Resource::Doctor, Action::Update)?;
    let availability = payload.availability.map(normalize_schedule).transpose()?;

    let txn = state.orm.begin().await?;
    let doctor = DoctorProfiles::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Doctor profile not found"))?;
    ensure_owner(user, &doctor, "Forbidden: You can only update your own doctor profile")?;

    let doctor = match non_blank(payload.specialization) {
        Some(specialization) => {
            let mut active: DoctorActive = doctor.into();
            active.specialization = Set(specialization);
            active.update(&txn).await?
        }
        None => doctor,
    };

    if let Some(availability) = availability {
        AvailabilityEntries::delete_many()
            .filter(AvailCol::DoctorId.eq(doctor.id))
            .exec(&txn)
            .await?;
        insert_schedule(&txn, doctor.id, &availability).await?;
    }

    let profile = mapping::load_doctor_profile(&txn, doctor).await?;
    txn.commit().await?;

    Ok(ApiResponse::success("Doctor updated", profile, Some(Meta::empty())))
}

/// Publishes the slots for one date, replacing whatever that date had before.
pub async fn set_availability(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: SetAvailabilityRequest,
) -> AppResult<ApiResponse<DoctorProfile>> {
    policy::authorize(user, Resource::Availability, Action::Update)?;
    let slots = normalize_slots(&payload.slots)?;

    let txn = state.orm.begin().await?;
    let doctor = DoctorProfiles::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Doctor not found"))?;
    ensure_owner(user, &doctor, "Forbidden: You can only update your own availability")?;

    let existing = AvailabilityEntries::find()
        .filter(AvailCol::DoctorId.eq(doctor.id))
        .filter(AvailCol::Date.eq(payload.date))
        .one(&txn)
        .await?;

    match existing {
        Some(entry) => {
            let mut active: AvailActive = entry.into();
            active.slots = Set(serde_json::json!(slots));
            active.update(&txn).await?;
        }
        None => {
            AvailActive {
                id: Set(Uuid::new_v4()),
                doctor_id: Set(doctor.id),
                date: Set(payload.date),
                slots: Set(serde_json::json!(slots)),
            }
            .insert(&txn)
            .await?;
        }
    }

    let profile = mapping::load_doctor_profile(&txn, doctor).await?;
    txn.commit().await?;

    tracing::info!(doctor_id = %profile.id, date = %payload.date, "availability published");
    Ok(ApiResponse::success("Availability updated", profile, Some(Meta::empty())))
}

/// Removes the profile, its schedule, its appointments and the owning account.
pub async fn delete_doctor(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<()>> {
    policy::authorize(user, Resource::Doctor, Action::Delete)?;

    let txn = state.orm.begin().await?;
    let doctor = DoctorProfiles::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Doctor not found"))?;

    purge_doctor_profile(&txn, doctor.id).await?;
    Users::delete_by_id(doctor.user_id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(doctor_id = %doctor.id, user_id = %doctor.user_id, "doctor deleted");
    Ok(ApiResponse::message_only("Doctor deleted successfully"))
}

/// Deletes a doctor profile along with its appointments and availability.
/// Runs on the caller's transaction.
pub async fn purge_doctor_profile<C: ConnectionTrait>(db: &C, doctor_id: Uuid) -> AppResult<()> {
    Appointments::delete_many()
        .filter(AppointmentCol::DoctorId.eq(doctor_id))
        .exec(db)
        .await?;
    AvailabilityEntries::delete_many()
        .filter(AvailCol::DoctorId.eq(doctor_id))
        .exec(db)
        .await?;
    DoctorProfiles::delete_by_id(doctor_id).exec(db).await?;
    Ok(())
}

pub async fn find_profile<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<DoctorModel> {
    DoctorProfiles::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Doctor profile not found"))
}

fn ensure_owner(user: &AuthUser, doctor: &DoctorModel, message: &str) -> AppResult<()> {
    if user.role == Role::Doctor && doctor.user_id != user.user_id {
        return Err(AppError::forbidden(message));
    }
    Ok(())
}

fn normalize_schedule(entries: Vec<AvailabilityEntry>) -> AppResult<Vec<AvailabilityEntry>> {
    let mut schedule: Vec<AvailabilityEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        if schedule.iter().any(|existing| existing.date == entry.date) {
            return Err(AppError::bad_request(format!(
                "Duplicate availability entry for {}",
                entry.date
            )));
        }
        schedule.push(AvailabilityEntry {
            date: entry.date,
            slots: normalize_slots(&entry.slots)?,
        });
    }
    schedule.sort_by_key(|entry| entry.date);
    Ok(schedule)
}

async fn insert_schedule<C: ConnectionTrait>(
    db: &C,
    doctor_id: Uuid,
    schedule: &[AvailabilityEntry],
) -> AppResult<()> {
    for entry in schedule {
        AvailActive {
            id: Set(Uuid::new_v4()),
            doctor_id: Set(doctor_id),
            date: Set(entry.date),
            slots: Set(serde_json::json!(entry.slots)),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn entry(day: u32, slots: &[&str]) -> AvailabilityEntry {
        AvailabilityEntry {
            date: NaiveDate::from_ymd_opt(2025, 7, day).unwrap(),
            slots: slots.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn schedule_is_sorted_and_normalized() {
        let schedule =
            normalize_schedule(vec![entry(3, &["10:00"]), entry(1, &["09:00 ", "09:00"])]).unwrap();
        assert_eq!(schedule, vec![entry(1, &["09:00"]), entry(3, &["10:00"])]);
    }

    #[test]
    fn duplicate_dates_are_rejected() {
        let err = normalize_schedule(vec![entry(1, &["09:00"]), entry(1, &["10:00"])]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn doctors_may_only_touch_their_own_profile() {
        let owner = Uuid::new_v4();
        let doctor = DoctorModel {
            id: Uuid::new_v4(),
            user_id: owner,
            specialization: "Cardiology".into(),
            created_at: chrono::Utc::now().into(),
        };

        let other_doctor = AuthUser { user_id: Uuid::new_v4(), role: Role::Doctor };
        let admin = AuthUser { user_id: Uuid::new_v4(), role: Role::Admin };
        let owning_doctor = AuthUser { user_id: owner, role: Role::Doctor };

        assert!(ensure_owner(&other_doctor, &doctor, "no").is_err());
        assert!(ensure_owner(&admin, &doctor, "no").is_ok());
        assert!(ensure_owner(&owning_doctor, &doctor, "no").is_ok());
    }
}
