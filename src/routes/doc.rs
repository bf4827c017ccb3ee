use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        appointments::{
            AppointmentDetails, AppointmentList, BookAppointmentRequest,
            UpdateAppointmentStatusRequest,
        },
        auth::{AuthResponse, LoginRequest, RegisterRequest},
        doctors::{
            CreateDoctorRequest, DoctorList, DoctorListing, SetAvailabilityRequest,
            UpdateDoctorRequest,
        },
        users::{AdminSummary, AdminUpdateUserRequest, CurrentUser, UpdateProfileRequest, UserList},
    },
    models::{
        Appointment, AppointmentStatus, AvailabilityEntry, DoctorProfile, DoctorSummary, Role,
        User, UserSummary,
    },
    response::{ApiResponse, Meta},
    routes::{admin, appointments, auth, doctors, health, params, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        doctors::list_doctors,
        doctors::get_doctor,
        doctors::create_doctor,
        doctors::update_doctor,
        doctors::delete_doctor,
        doctors::set_availability,
        appointments::book_appointment,
        appointments::list_appointments,
        appointments::list_upcoming,
        appointments::cancel_appointment,
        users::get_me,
        users::update_me,
        users::list_users,
        users::update_user,
        users::delete_user,
        admin::summary,
        admin::list_all_appointments,
        admin::update_appointment_status,
        admin::delete_appointment
    ),
    components(
        schemas(
            Role,
            AppointmentStatus,
            User,
            UserSummary,
            AvailabilityEntry,
            DoctorProfile,
            DoctorSummary,
            Appointment,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            CreateDoctorRequest,
            UpdateDoctorRequest,
            SetAvailabilityRequest,
            DoctorListing,
            DoctorList,
            BookAppointmentRequest,
            UpdateAppointmentStatusRequest,
            AppointmentDetails,
            AppointmentList,
            UpdateProfileRequest,
            AdminUpdateUserRequest,
            CurrentUser,
            UserList,
            AdminSummary,
            params::Pagination,
            params::DoctorQuery,
            params::AppointmentListQuery,
            params::UserListQuery,
            Meta,
            ApiResponse<AuthResponse>,
            ApiResponse<DoctorProfile>,
            ApiResponse<DoctorList>,
            ApiResponse<Appointment>,
            ApiResponse<AppointmentList>,
            ApiResponse<CurrentUser>,
            ApiResponse<UserList>,
            ApiResponse<AdminSummary>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and login"),
        (name = "Doctors", description = "Doctor directory and schedules"),
        (name = "Appointments", description = "Booking and cancellation"),
        (name = "Users", description = "Account endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
