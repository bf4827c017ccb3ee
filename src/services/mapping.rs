use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::{
    entity::{
        appointments::Model as AppointmentModel,
        availability_entries::{
            Column as AvailCol, Entity as AvailabilityEntries, Model as AvailModel,
        },
        doctor_profiles::{Column as DoctorCol, Entity as DoctorProfiles, Model as DoctorModel},
        users::{Column as UserCol, Entity as Users, Model as UserModel},
    },
    dto::appointments::AppointmentDetails,
    error::{AppError, AppResult},
    models::{
        Appointment, AppointmentStatus, AvailabilityEntry, DoctorProfile, DoctorSummary, Role,
        User, UserSummary,
    },
};

/// Row shape for the raw sqlx queries against `users`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn role(&self) -> AppResult<Role> {
        parse_role(&self.role)
    }

    pub fn into_user(self) -> AppResult<User> {
        Ok(User {
            role: parse_role(&self.role)?,
            id: self.id,
            username: self.username,
            email: self.email,
            name: self.name,
            image: self.image,
            location: self.location,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn parse_role(role: &str) -> AppResult<Role> {
    role.parse::<Role>()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("stored user role: {e}")))
}

pub fn user_from_entity(model: UserModel) -> AppResult<User> {
    Ok(User {
        role: parse_role(&model.role)?,
        id: model.id,
        username: model.username,
        email: model.email,
        name: model.name,
        image: model.image,
        location: model.location,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub fn appointment_from_entity(model: AppointmentModel) -> AppResult<Appointment> {
    let status = model
        .status
        .parse::<AppointmentStatus>()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("stored appointment status: {e}")))?;
    Ok(Appointment {
        id: model.id,
        doctor_id: model.doctor_id,
        patient_id: model.patient_id,
        date: model.date,
        time: model.time,
        duration_minutes: model.duration_minutes,
        status,
        notes: model.notes,
        symptoms: model.symptoms,
        signs: model.signs,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub fn availability_from_entity(model: AvailModel) -> AppResult<AvailabilityEntry> {
    let slots: Vec<String> = serde_json::from_value(model.slots)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("stored availability slots: {e}")))?;
    Ok(AvailabilityEntry {
        date: model.date,
        slots,
    })
}

pub fn doctor_from_entity(
    model: DoctorModel,
    availability: Vec<AvailabilityEntry>,
) -> DoctorProfile {
    DoctorProfile {
        id: model.id,
        user_id: model.user_id,
        specialization: model.specialization,
        availability,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

/// Availability of one doctor, ordered by date.
pub async fn load_availability<C: ConnectionTrait>(
    db: &C,
    doctor_id: Uuid,
) -> AppResult<Vec<AvailabilityEntry>> {
    AvailabilityEntries::find()
        .filter(AvailCol::DoctorId.eq(doctor_id))
        .order_by_asc(AvailCol::Date)
        .all(db)
        .await?
        .into_iter()
        .map(availability_from_entity)
        .collect()
}

pub async fn load_doctor_profile<C: ConnectionTrait>(
    db: &C,
    model: DoctorModel,
) -> AppResult<DoctorProfile> {
    let availability = load_availability(db, model.id).await?;
    Ok(doctor_from_entity(model, availability))
}

pub fn summary_from_entity(model: &UserModel) -> UserSummary {
    UserSummary {
        id: model.id,
        username: model.username.clone(),
        email: model.email.clone(),
        name: model.name.clone(),
        image: model.image.clone(),
        location: model.location.clone(),
    }
}

/// Resolves the doctor and patient of each appointment with two batched lookups.
pub async fn attach_parties<C: ConnectionTrait>(
    db: &C,
    appointments: Vec<AppointmentModel>,
) -> AppResult<Vec<AppointmentDetails>> {
    if appointments.is_empty() {
        return Ok(Vec::new());
    }

    let doctor_ids: HashSet<Uuid> = appointments.iter().map(|a| a.doctor_id).collect();
    let doctors: HashMap<Uuid, DoctorModel> = DoctorProfiles::find()
        .filter(DoctorCol::Id.is_in(doctor_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|doctor| (doctor.id, doctor))
        .collect();

    let user_ids: HashSet<Uuid> = appointments
        .iter()
        .map(|a| a.patient_id)
        .chain(doctors.values().map(|d| d.user_id))
        .collect();
    let users: HashMap<Uuid, UserSummary> = Users::find()
        .filter(UserCol::Id.is_in(user_ids))
        .all(db)
        .await?
        .iter()
        .map(|user| (user.id, summary_from_entity(user)))
        .collect();

    appointments
        .into_iter()
        .map(|model| {
            let doctor = doctors.get(&model.doctor_id).map(|doctor| DoctorSummary {
                id: doctor.id,
                specialization: doctor.specialization.clone(),
                user: users.get(&doctor.user_id).cloned(),
            });
            let patient = users.get(&model.patient_id).cloned();
            Ok(AppointmentDetails {
                appointment: appointment_from_entity(model)?,
                doctor,
                patient,
            })
        })
        .collect()
}
