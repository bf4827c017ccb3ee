use chrono::{Days, Utc};
use doc_booking_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    models::Role,
    services::auth_service::hash_password,
};
use uuid::Uuid;

const SEED_SLOTS: [&str; 4] = ["09:00", "10:00", "11:00", "14:00"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "admin", "admin@example.com", "admin123", Role::Admin).await?;

    for (username, email, specialization) in [
        ("dr_house", "house@example.com", "Diagnostics"),
        ("dr_grey", "grey@example.com", "General Surgery"),
    ] {
        let user_id = ensure_user(&pool, username, email, "doctor123", Role::Doctor).await?;
        let doctor_id = ensure_doctor_profile(&pool, user_id, specialization).await?;
        seed_availability(&pool, doctor_id).await?;
    }

    for (username, email) in [
        ("alice", "alice@example.com"),
        ("bob", "bob@example.com"),
    ] {
        ensure_user(&pool, username, email, "patient123", Role::Patient).await?;
    }

    println!("Seed completed. Admin ID: {admin_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, email, password_hash, role, name)
        VALUES ($1, $2, $3, $4, $5, $2)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_doctor_profile(
    pool: &sqlx::PgPool,
    user_id: Uuid,
    specialization: &str,
) -> anyhow::Result<Uuid> {
    let (doctor_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO doctor_profiles (id, user_id, specialization)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id) DO UPDATE SET specialization = EXCLUDED.specialization
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(specialization)
    .fetch_one(pool)
    .await?;
    Ok(doctor_id)
}

/// Publishes the same slots for each of the next seven days.
async fn seed_availability(pool: &sqlx::PgPool, doctor_id: Uuid) -> anyhow::Result<()> {
    let today = Utc::now().date_naive();
    let slots = serde_json::to_string(&SEED_SLOTS)?;

    for offset in 1..=7 {
        let Some(date) = today.checked_add_days(Days::new(offset)) else {
            continue;
        };
        sqlx::query(
            r#"
            INSERT INTO availability_entries (id, doctor_id, date, slots)
            VALUES ($1, $2, $3, $4::jsonb)
            ON CONFLICT (doctor_id, date) DO UPDATE SET slots = EXCLUDED.slots
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(doctor_id)
        .bind(date)
        .bind(&slots)
        .execute(pool)
        .await?;
    }

    println!("Seeded availability for doctor {doctor_id}");
    Ok(())
}
