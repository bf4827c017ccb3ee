use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{DoctorProfile, User};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub image: Option<String>,
    pub password: Option<String>,
    pub specialization: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AdminUpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub image: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub specialization: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentUser {
    #[serde(flatten)]
    pub user: User,
    pub doctor_profile: Option<DoctorProfile>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct UserList {
    #[schema(value_type = Vec<User>)]
    pub items: Vec<User>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminSummary {
    pub total_users: u64,
    pub total_doctors: u64,
    pub total_appointments: u64,
    pub pending_appointments: u64,
}
