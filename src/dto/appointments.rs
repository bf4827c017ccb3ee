use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Appointment, DoctorSummary, UserSummary};

#[derive(Debug, Deserialize, ToSchema)]
pub struct BookAppointmentRequest {
    /// User id of the doctor.
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: String,
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
    pub symptoms: Option<String>,
    pub signs: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAppointmentStatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub doctor: Option<DoctorSummary>,
    pub patient: Option<UserSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct AppointmentList {
    #[schema(value_type = Vec<AppointmentDetails>)]
    pub items: Vec<AppointmentDetails>,
}
