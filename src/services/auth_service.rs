use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;
use uuid::Uuid;

use crate::{
    dto::auth::{AuthResponse, LoginRequest, RegisterRequest},
    error::{AppError, AppResult},
    middleware::auth::issue_token,
    models::Role,
    response::{ApiResponse, Meta},
    services::mapping::UserRow,
    state::AppState,
};

pub const DOCTOR_PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/150/4a90e2/ffffff?text=DR";
pub const USER_PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/150/007bff/ffffff?text=U";

const TAKEN: &str = "Username or email already exists. Please use a different one";

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Empty or whitespace-only strings count as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    let RegisterRequest {
        username,
        email,
        password,
        role,
        specialization,
        name,
        image,
        location,
    } = payload;
    let username = username.trim().to_string();
    let email = email.trim().to_string();

    if username.is_empty() || email.is_empty() || password.is_empty() || role.is_empty() {
        return Err(AppError::bad_request(
            "username, email, password and role are required",
        ));
    }
    let role = role
        .parse::<Role>()
        .map_err(|_| AppError::bad_request("role must be one of patient, doctor, admin"))?;
    let specialization = non_blank(specialization);
    if role == Role::Doctor && specialization.is_none() {
        return Err(AppError::bad_request(
            "Specialization is required for doctor registration",
        ));
    }

    tracing::info!(%username, %role, "registration attempt");

    let exist: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE email = $1 OR username = $2")
            .bind(email.as_str())
            .bind(username.as_str())
            .fetch_optional(&state.pool)
            .await?;
    if exist.is_some() {
        return Err(AppError::conflict(TAKEN));
    }

    let password_hash = hash_password(&password)?;
    let name = non_blank(name).unwrap_or_else(|| username.clone());
    let image = non_blank(image).unwrap_or_else(|| match role {
        Role::Doctor => DOCTOR_PLACEHOLDER_IMAGE.to_string(),
        _ => USER_PLACEHOLDER_IMAGE.to_string(),
    });
    let location = location.unwrap_or_default();

    let mut tx = state.pool.begin().await?;

    let user: UserRow = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, email, password_hash, role, name, image, location)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username.as_str())
    .bind(email.as_str())
    .bind(password_hash)
    .bind(role.as_str())
    .bind(name)
    .bind(image)
    .bind(location)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::from(e).or_conflict(TAKEN))?;

    if let Some(specialization) = specialization.filter(|_| role == Role::Doctor) {
        let profile_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO doctor_profiles (id, user_id, specialization) VALUES ($1, $2, $3)",
        )
        .bind(profile_id)
        .bind(user.id)
        .bind(specialization)
        .execute(&mut *tx)
        .await?;
        tracing::info!(user_id = %user.id, %profile_id, "doctor profile created");
    }

    tx.commit().await?;

    let token = issue_token(
        &state.config.jwt_secret,
        user.id,
        role,
        state.config.token_ttl_hours,
    )?;
    tracing::info!(user_id = %user.id, %role, "user registered");

    Ok(ApiResponse::success(
        "Registration successful",
        AuthResponse {
            token,
            user: user.into_user()?,
        },
        Some(Meta::empty()),
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    let LoginRequest { username, password } = payload;
    if username.trim().is_empty() || password.is_empty() {
        return Err(AppError::bad_request("Missing credentials"));
    }

    let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username.trim())
        .fetch_optional(&state.pool)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AppError::unauthorized("Invalid username or password")),
    };

    if !verify_password(&password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "login rejected");
        return Err(AppError::unauthorized("Invalid username or password"));
    }

    let role = user.role()?;
    let token = issue_token(
        &state.config.jwt_secret,
        user.id,
        role,
        state.config.token_ttl_hours,
    )?;

    Ok(ApiResponse::success(
        "Logged in",
        AuthResponse {
            token,
            user: user.into_user()?,
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_only_its_password() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(verify_password("s3cret-pass", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn blank_strings_are_absent() {
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(Some(" Cardiology ".into())), Some("Cardiology".into()));
        assert_eq!(non_blank(None), None);
    }
}
