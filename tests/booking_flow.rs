use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use doc_booking_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        appointments::{BookAppointmentRequest, UpdateAppointmentStatusRequest},
        auth::{LoginRequest, RegisterRequest},
        doctors::SetAvailabilityRequest,
    },
    entity::{
        appointments::{Column as AppointmentCol, Entity as Appointments},
        doctor_profiles::{Column as DoctorCol, Entity as DoctorProfiles},
        users::Entity as Users,
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::{Appointment, AppointmentStatus},
    services::{admin_service, appointment_service, auth_service, doctor_service, user_service},
    state::AppState,
};
use axum::http::StatusCode;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use std::sync::Arc;
use uuid::Uuid;

const SLOT_DATE: (i32, u32, u32) = (2025, 7, 1);

// Accounts get a random suffix so the tests can share one database and run in parallel.
async fn setup_state() -> anyhow::Result<Option<AppState>> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run booking flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;
    let orm = create_orm_conn(&database_url).await?;

    let config = AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 3000,
        jwt_secret: "integration-test-secret-0123456789abcdef".into(),
        client_url: "http://localhost:5173".into(),
        token_ttl_hours: 24,
    };

    Ok(Some(AppState {
        pool,
        orm,
        config: Arc::new(config),
    }))
}

async fn register(
    state: &AppState,
    prefix: &str,
    role: &str,
    specialization: Option<&str>,
) -> anyhow::Result<(AuthUser, String)> {
    let username = format!("{prefix}_{}", Uuid::new_v4().simple());
    let resp = auth_service::register_user(
        state,
        RegisterRequest {
            username: username.clone(),
            email: format!("{username}@example.com"),
            password: "password123".into(),
            role: role.into(),
            specialization: specialization.map(str::to_string),
            name: None,
            image: None,
            location: None,
        },
    )
    .await?;
    let user = resp.data.expect("auth data").user;
    Ok((
        AuthUser {
            user_id: user.id,
            role: user.role,
        },
        username,
    ))
}

/// Registers a doctor publishing `slots` on the scenario date; returns the account and profile id.
async fn doctor_with_slots(state: &AppState, slots: &[&str]) -> anyhow::Result<(AuthUser, Uuid)> {
    let (doctor, _) = register(state, "doc", "doctor", Some("Cardiology")).await?;
    let profile = DoctorProfiles::find()
        .filter(DoctorCol::UserId.eq(doctor.user_id))
        .one(&state.orm)
        .await?
        .expect("profile created at registration");

    doctor_service::set_availability(
        state,
        &doctor,
        profile.id,
        SetAvailabilityRequest {
            date: slot_date(),
            slots: slots.iter().map(|s| s.to_string()).collect(),
        },
    )
    .await?;
    Ok((doctor, profile.id))
}

fn slot_date() -> NaiveDate {
    let (y, m, d) = SLOT_DATE;
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).single().expect("valid instant")
}

fn request(doctor: &AuthUser, date: NaiveDate, time: &str) -> BookAppointmentRequest {
    BookAppointmentRequest {
        doctor_id: doctor.user_id,
        date,
        time: time.into(),
        duration_minutes: Some(30),
        notes: Some("Routine check".into()),
        symptoms: None,
        signs: None,
    }
}

async fn book(
    state: &AppState,
    patient: &AuthUser,
    req: BookAppointmentRequest,
    now: DateTime<Utc>,
) -> Result<Appointment, AppError> {
    appointment_service::book_appointment_at(state, patient, req, now)
        .await
        .map(|resp| resp.data.expect("appointment data"))
}

#[tokio::test]
async fn booking_a_published_slot_then_rebooking_it_conflicts() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let (doctor, profile_id) = doctor_with_slots(&state, &["09:00", "10:00"]).await?;
    let (patient, _) = register(&state, "pat", "patient", None).await?;
    let (other, _) = register(&state, "pat", "patient", None).await?;
    let now = at(2025, 6, 20, 8, 0);

    let booked = book(&state, &patient, request(&doctor, slot_date(), "09:00"), now).await?;
    assert_eq!(booked.status, AppointmentStatus::Booked);
    assert_eq!(booked.doctor_id, profile_id);
    assert_eq!(booked.patient_id, patient.user_id);

    let err = book(&state, &other, request(&doctor, slot_date(), "09:00"), now)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);
    assert_eq!(err.to_string(), "Slot already booked by another patient");

    // Booking never consumes the published slot.
    let profile = doctor_service::get_doctor(&state, profile_id).await?;
    let availability = profile.data.expect("profile").availability;
    assert_eq!(availability[0].slots, vec!["09:00", "10:00"]);
    Ok(())
}

#[tokio::test]
async fn unpublished_slot_and_date_window_are_rejected() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let (doctor, _) = doctor_with_slots(&state, &["09:00", "10:00"]).await?;
    let (patient, _) = register(&state, "pat", "patient", None).await?;

    let err = book(
        &state,
        &patient,
        request(&doctor, slot_date(), "23:59"),
        at(2025, 6, 20, 8, 0),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);
    assert_eq!(err.to_string(), "Selected slot is not available");

    // The day after the slot date, the slot date is yesterday.
    let err = book(
        &state,
        &patient,
        request(&doctor, slot_date(), "09:00"),
        at(2025, 7, 2, 8, 0),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.to_string(), "Cannot book appointments in the past");

    let err = book(
        &state,
        &patient,
        request(&doctor, slot_date(), "09:00"),
        at(2024, 12, 31, 8, 0),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        err.to_string(),
        "Cannot book appointments more than 6 months in advance"
    );
    Ok(())
}

#[tokio::test]
async fn only_patients_can_book() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let (doctor, _) = doctor_with_slots(&state, &["09:00"]).await?;

    let err = book(
        &state,
        &doctor,
        request(&doctor, slot_date(), "09:00"),
        at(2025, 6, 20, 8, 0),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
    assert_eq!(err.to_string(), "Only patients can book appointments");

    let err = book(
        &state,
        &doctor,
        request(
            &AuthUser {
                user_id: Uuid::new_v4(),
                role: doctor.role,
            },
            slot_date(),
            "09:00",
        ),
        at(2025, 6, 20, 8, 0),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn cancellation_respects_the_24_hour_window() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let (doctor, _) = doctor_with_slots(&state, &["09:00", "11:00"]).await?;
    let (patient, _) = register(&state, "pat", "patient", None).await?;
    let (stranger, _) = register(&state, "pat", "patient", None).await?;
    let booked_at = at(2025, 6, 20, 8, 0);

    let early = book(&state, &patient, request(&doctor, slot_date(), "09:00"), booked_at).await?;
    let later = book(&state, &patient, request(&doctor, slot_date(), "11:00"), booked_at).await?;

    // 23 hours before 09:00 on the slot date.
    let now = at(2025, 6, 30, 10, 0);
    let err = appointment_service::cancel_appointment_at(&state, &patient, early.id, now)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.to_string(), "Cannot cancel within 24 hours of appointment");

    let err = appointment_service::cancel_appointment_at(&state, &stranger, later.id, now)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    // 25 hours before 11:00.
    let cancelled = appointment_service::cancel_appointment_at(&state, &patient, later.id, now)
        .await?
        .data
        .expect("appointment data");
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    let err = appointment_service::cancel_appointment_at(&state, &patient, later.id, now)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Appointment already cancelled");

    // A cancelled slot can be booked again without republishing it.
    let (next, _) = register(&state, "pat", "patient", None).await?;
    book(&state, &next, request(&doctor, slot_date(), "11:00"), now).await?;
    Ok(())
}

#[tokio::test]
async fn admin_reactivation_skips_the_slot_check() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let (doctor, profile_id) = doctor_with_slots(&state, &["09:00"]).await?;
    let (first, _) = register(&state, "pat", "patient", None).await?;
    let (second, _) = register(&state, "pat", "patient", None).await?;
    let (admin, _) = register(&state, "adm", "admin", None).await?;
    let now = at(2025, 6, 20, 8, 0);

    let original = book(&state, &first, request(&doctor, slot_date(), "09:00"), now).await?;
    appointment_service::cancel_appointment_at(&state, &first, original.id, now).await?;
    book(&state, &second, request(&doctor, slot_date(), "09:00"), now).await?;

    let reactivated = admin_service::update_appointment_status(
        &state,
        &admin,
        original.id,
        UpdateAppointmentStatusRequest {
            status: "booked".into(),
        },
    )
    .await?
    .data
    .expect("appointment data");
    assert_eq!(reactivated.status, AppointmentStatus::Booked);

    let active = Appointments::find()
        .filter(AppointmentCol::DoctorId.eq(profile_id))
        .filter(AppointmentCol::Status.ne("cancelled"))
        .count(&state.orm)
        .await?;
    assert_eq!(active, 2);

    let err = admin_service::update_appointment_status(
        &state,
        &admin,
        original.id,
        UpdateAppointmentStatusRequest {
            status: "done".into(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let err = admin_service::update_appointment_status(
        &state,
        &first,
        original.id,
        UpdateAppointmentStatusRequest {
            status: "completed".into(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn concurrent_bookings_for_one_slot_admit_a_single_winner() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let (doctor, profile_id) = doctor_with_slots(&state, &["10:00"]).await?;
    let (first, _) = register(&state, "pat", "patient", None).await?;
    let (second, _) = register(&state, "pat", "patient", None).await?;
    let now = at(2025, 6, 20, 8, 0);

    let (a, b) = tokio::join!(
        book(&state, &first, request(&doctor, slot_date(), "10:00"), now),
        book(&state, &second, request(&doctor, slot_date(), "10:00"), now),
    );
    let outcomes = [a, b];
    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = outcomes
        .iter()
        .find_map(|r| r.as_ref().err())
        .expect("one booking rejected");
    assert_eq!(loser.status(), StatusCode::CONFLICT);

    let stored = Appointments::find()
        .filter(AppointmentCol::DoctorId.eq(profile_id))
        .count(&state.orm)
        .await?;
    assert_eq!(stored, 1);
    Ok(())
}

#[tokio::test]
async fn deleting_accounts_cascades_to_dependent_records() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let (doctor, profile_id) = doctor_with_slots(&state, &["09:00", "10:00"]).await?;
    let (patient, _) = register(&state, "pat", "patient", None).await?;
    let (other, _) = register(&state, "pat", "patient", None).await?;
    let (admin, _) = register(&state, "adm", "admin", None).await?;
    let now = at(2025, 6, 20, 8, 0);

    let kept = book(&state, &other, request(&doctor, slot_date(), "10:00"), now).await?;
    book(&state, &patient, request(&doctor, slot_date(), "09:00"), now).await?;

    user_service::delete_user(&state, &admin, patient.user_id).await?;
    assert!(Users::find_by_id(patient.user_id).one(&state.orm).await?.is_none());
    let remaining = Appointments::find()
        .filter(AppointmentCol::DoctorId.eq(profile_id))
        .all(&state.orm)
        .await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, kept.id);

    let err = doctor_service::delete_doctor(&state, &other, profile_id)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    doctor_service::delete_doctor(&state, &admin, profile_id).await?;
    assert!(DoctorProfiles::find_by_id(profile_id).one(&state.orm).await?.is_none());
    assert!(Users::find_by_id(doctor.user_id).one(&state.orm).await?.is_none());
    assert!(Appointments::find_by_id(kept.id).one(&state.orm).await?.is_none());
    assert!(Users::find_by_id(other.user_id).one(&state.orm).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn registration_and_login_round_trip() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let (patient, username) = register(&state, "pat", "patient", None).await?;

    let resp = auth_service::login_user(
        &state,
        LoginRequest {
            username: username.clone(),
            password: "password123".into(),
        },
    )
    .await?;
    let data = resp.data.expect("auth data");
    assert_eq!(data.user.id, patient.user_id);
    assert!(!data.token.is_empty());

    let err = auth_service::login_user(
        &state,
        LoginRequest {
            username: username.clone(),
            password: "wrong-password".into(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

    let err = auth_service::register_user(
        &state,
        RegisterRequest {
            username: username.clone(),
            email: format!("other_{username}@example.com"),
            password: "password123".into(),
            role: "patient".into(),
            specialization: None,
            name: None,
            image: None,
            location: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);

    let err = auth_service::register_user(
        &state,
        RegisterRequest {
            username: format!("doc_{username}"),
            email: format!("doc_{username}@example.com"),
            password: "password123".into(),
            role: "doctor".into(),
            specialization: Some("   ".into()),
            name: None,
            image: None,
            location: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
