use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{AvailabilityEntry, UserSummary};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDoctorRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub availability: Vec<AvailabilityEntry>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDoctorRequest {
    pub specialization: Option<String>,
    /// Replaces the whole schedule when present.
    pub availability: Option<Vec<AvailabilityEntry>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetAvailabilityRequest {
    pub date: NaiveDate,
    pub slots: Vec<String>,
}

/// Doctor profile joined with the public part of its user account.
#[derive(Debug, Serialize, ToSchema)]
pub struct DoctorListing {
    pub id: Uuid,
    pub specialization: String,
    pub availability: Vec<AvailabilityEntry>,
    pub user: UserSummary,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct DoctorList {
    #[schema(value_type = Vec<DoctorListing>)]
    pub items: Vec<DoctorListing>,
}
