use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    dto::users::{AdminUpdateUserRequest, CurrentUser, UpdateProfileRequest, UserList},
    entity::{
        appointments::{Column as AppointmentCol, Entity as Appointments},
        doctor_profiles::{
            ActiveModel as DoctorActive, Column as DoctorCol, Entity as DoctorProfiles,
            Model as DoctorModel,
        },
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Role, User},
    policy::{self, Action, Resource},
    response::{ApiResponse, Meta},
    routes::params::UserListQuery,
    services::{
        auth_service::{hash_password, non_blank},
        doctor_service::purge_doctor_profile,
        mapping,
    },
    state::AppState,
};

const TAKEN: &str = "Username or email already exists";
const DEFAULT_SPECIALIZATION: &str = "General";

/// Account fields shared by self-service and admin edits.
struct AccountChanges {
    username: Option<String>,
    email: Option<String>,
    name: Option<String>,
    location: Option<String>,
    image: Option<String>,
    password: Option<String>,
}

impl AccountChanges {
    fn apply(self, model: UserModel) -> AppResult<UserActive> {
        let mut active: UserActive = model.into();
        if let Some(username) = non_blank(self.username) {
            active.username = Set(username);
        }
        if let Some(email) = non_blank(self.email) {
            active.email = Set(email);
        }
        // Name, location and image may be cleared with an empty string.
        if let Some(name) = self.name {
            active.name = Set(Some(name));
        }
        if let Some(location) = self.location {
            active.location = Set(Some(location));
        }
        if let Some(image) = self.image {
            active.image = Set(Some(image));
        }
        if let Some(password) = self.password.filter(|p| !p.is_empty()) {
            active.password_hash = Set(hash_password(&password)?);
        }
        active.updated_at = Set(Utc::now().into());
        Ok(active)
    }
}

pub async fn get_me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CurrentUser>> {
    let account = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    let current = current_user(&state.orm, account).await?;
    Ok(ApiResponse::success("Current user", current, Some(Meta::empty())))
}

pub async fn update_me(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<CurrentUser>> {
    let UpdateProfileRequest {
        username,
        email,
        name,
        location,
        image,
        password,
        specialization,
    } = payload;

    let txn = state.orm.begin().await?;
    let account = Users::find_by_id(user.user_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let changes = AccountChanges {
        username,
        email,
        name,
        location,
        image,
        password,
    };
    let account = changes
        .apply(account)?
        .update(&txn)
        .await
        .map_err(|e| AppError::from(e).or_conflict(TAKEN))?;

    if account.role == Role::Doctor.as_str() {
        if let Some(specialization) = non_blank(specialization) {
            if let Some(doctor) = find_profile_for(&txn, account.id).await? {
                let mut active: DoctorActive = doctor.into();
                active.specialization = Set(specialization);
                active.update(&txn).await?;
            }
        }
    }

    let current = current_user(&txn, account).await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "Profile updated successfully",
        current,
        Some(Meta::empty()),
    ))
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    query: UserListQuery,
) -> AppResult<ApiResponse<UserList>> {
    policy::authorize(user, Resource::User, Action::List)?;
    let (page, limit, offset) = query.pagination().normalize();

    let finder = Users::find().order_by_asc(UserCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(mapping::user_from_entity)
        .collect::<AppResult<Vec<User>>>()?;

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Admin edit of any account. The doctor profile follows the resulting role:
/// created when the account becomes a doctor, removed when it stops being one.
pub async fn admin_update_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AdminUpdateUserRequest,
) -> AppResult<ApiResponse<CurrentUser>> {
    policy::authorize(user, Resource::User, Action::Update)?;
    let AdminUpdateUserRequest {
        username,
        email,
        name,
        location,
        image,
        password,
        role,
        specialization,
    } = payload;
    let role = non_blank(role)
        .map(|r| r.parse::<Role>())
        .transpose()
        .map_err(|_| AppError::bad_request("role must be one of patient, doctor, admin"))?;

    let txn = state.orm.begin().await?;
    let account = Users::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let changes = AccountChanges {
        username,
        email,
        name,
        location,
        image,
        password,
    };
    let mut active = changes.apply(account)?;
    if let Some(role) = role {
        active.role = Set(role.as_str().to_string());
    }
    let account = active
        .update(&txn)
        .await
        .map_err(|e| AppError::from(e).or_conflict(TAKEN))?;

    let profile = find_profile_for(&txn, account.id).await?;
    let specialization = non_blank(specialization);
    match (account.role == Role::Doctor.as_str(), profile) {
        (true, None) => {
            DoctorActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(account.id),
                specialization: Set(
                    specialization.unwrap_or_else(|| DEFAULT_SPECIALIZATION.to_string()),
                ),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?;
            tracing::info!(user_id = %account.id, "doctor profile created for promoted user");
        }
        (true, Some(doctor)) => {
            if let Some(specialization) = specialization {
                let mut active: DoctorActive = doctor.into();
                active.specialization = Set(specialization);
                active.update(&txn).await?;
            }
        }
        (false, Some(doctor)) => {
            purge_doctor_profile(&txn, doctor.id).await?;
            tracing::info!(user_id = %account.id, "doctor profile removed after role change");
        }
        (false, None) => {}
    }

    let current = current_user(&txn, account).await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "User updated successfully",
        current,
        Some(Meta::empty()),
    ))
}

/// Deletes an account with everything that hangs off it, in one transaction.
pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<()>> {
    policy::authorize(user, Resource::User, Action::Delete)?;

    let txn = state.orm.begin().await?;
    let account = Users::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Appointments::delete_many()
        .filter(AppointmentCol::PatientId.eq(account.id))
        .exec(&txn)
        .await?;
    if let Some(doctor) = find_profile_for(&txn, account.id).await? {
        purge_doctor_profile(&txn, doctor.id).await?;
    }
    Users::delete_by_id(account.id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(user_id = %account.id, "user deleted");
    Ok(ApiResponse::message_only("User deleted successfully"))
}

async fn find_profile_for(
    txn: &DatabaseTransaction,
    user_id: Uuid,
) -> AppResult<Option<DoctorModel>> {
    let profile = DoctorProfiles::find()
        .filter(DoctorCol::UserId.eq(user_id))
        .one(txn)
        .await?;
    Ok(profile)
}

async fn current_user<C: sea_orm::ConnectionTrait>(
    db: &C,
    account: UserModel,
) -> AppResult<CurrentUser> {
    let user = mapping::user_from_entity(account)?;
    let doctor_profile = match user.role {
        Role::Doctor => {
            let profile = DoctorProfiles::find()
                .filter(DoctorCol::UserId.eq(user.id))
                .one(db)
                .await?;
            match profile {
                Some(profile) => Some(mapping::load_doctor_profile(db, profile).await?),
                None => None,
            }
        }
        _ => None,
    };
    Ok(CurrentUser {
        user,
        doctor_profile,
    })
}
