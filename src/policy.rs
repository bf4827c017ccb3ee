//! Role-based access table.
//!
//! Routes ask `authorize(user, resource, action)`; which roles may do what is
//! declared once in [`POLICY`]. Ownership checks (a doctor editing only their own
//! profile, a patient cancelling only their own appointment) stay in the
//! services because they need the stored record.

use crate::{error::AppError, middleware::auth::AuthUser, models::Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Doctor,
    Availability,
    Appointment,
    User,
    Summary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Create,
    Update,
    Delete,
    Book,
    ListOwn,
    Cancel,
    SetStatus,
}

const PATIENT: &[Role] = &[Role::Patient];
const ADMIN: &[Role] = &[Role::Admin];
const DOCTOR_OR_ADMIN: &[Role] = &[Role::Doctor, Role::Admin];
const PATIENT_OR_DOCTOR: &[Role] = &[Role::Patient, Role::Doctor];
const ANY_ROLE: &[Role] = &[Role::Patient, Role::Doctor, Role::Admin];

pub const POLICY: &[(Resource, Action, &[Role])] = &[
    (Resource::Doctor, Action::Create, ADMIN),
    (Resource::Doctor, Action::Update, DOCTOR_OR_ADMIN),
    (Resource::Doctor, Action::Delete, ADMIN),
    (Resource::Availability, Action::Update, DOCTOR_OR_ADMIN),
    (Resource::Appointment, Action::Book, PATIENT),
    (Resource::Appointment, Action::ListOwn, PATIENT_OR_DOCTOR),
    (Resource::Appointment, Action::Cancel, ANY_ROLE),
    (Resource::Appointment, Action::List, ADMIN),
    (Resource::Appointment, Action::SetStatus, ADMIN),
    (Resource::Appointment, Action::Delete, ADMIN),
    (Resource::User, Action::List, ADMIN),
    (Resource::User, Action::Update, ADMIN),
    (Resource::User, Action::Delete, ADMIN),
    (Resource::Summary, Action::List, ADMIN),
];

/// Roles allowed to perform `action` on `resource`; empty when nothing is declared.
pub fn allowed_roles(resource: Resource, action: Action) -> &'static [Role] {
    POLICY
        .iter()
        .find(|(r, a, _)| *r == resource && *a == action)
        .map(|(_, _, roles)| *roles)
        .unwrap_or(&[])
}

pub fn is_allowed(role: Role, resource: Resource, action: Action) -> bool {
    allowed_roles(resource, action).contains(&role)
}

pub fn authorize(user: &AuthUser, resource: Resource, action: Action) -> Result<(), AppError> {
    if is_allowed(user.role, resource, action) {
        return Ok(());
    }
    Err(AppError::forbidden(denial_message(resource, action)))
}

fn denial_message(resource: Resource, action: Action) -> &'static str {
    match (resource, action) {
        (Resource::Appointment, Action::Book) => "Only patients can book appointments",
        (Resource::Appointment, Action::ListOwn) => {
            "Access denied. User role not recognized for appointment fetching"
        }
        (Resource::Appointment, Action::Cancel) => "Unauthorized to cancel this appointment",
        _ => "Forbidden: Insufficient permissions",
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn only_patients_book() {
        assert!(authorize(&user(Role::Patient), Resource::Appointment, Action::Book).is_ok());
        for role in [Role::Doctor, Role::Admin] {
            let err = authorize(&user(role), Resource::Appointment, Action::Book).unwrap_err();
            assert_eq!(err.to_string(), "Only patients can book appointments");
        }
    }

    #[test]
    fn admin_endpoints_reject_other_roles() {
        for (resource, action) in [
            (Resource::User, Action::List),
            (Resource::User, Action::Delete),
            (Resource::Summary, Action::List),
            (Resource::Appointment, Action::SetStatus),
        ] {
            assert!(is_allowed(Role::Admin, resource, action));
            assert!(!is_allowed(Role::Doctor, resource, action));
            assert!(!is_allowed(Role::Patient, resource, action));
        }
    }

    #[test]
    fn doctors_and_admins_manage_availability() {
        assert!(is_allowed(Role::Doctor, Resource::Availability, Action::Update));
        assert!(is_allowed(Role::Admin, Resource::Availability, Action::Update));
        assert!(!is_allowed(Role::Patient, Resource::Availability, Action::Update));
    }

    #[test]
    fn undeclared_pairs_allow_nobody() {
        assert!(allowed_roles(Resource::Summary, Action::Book).is_empty());
    }

    #[test]
    fn each_pair_is_declared_once() {
        for (i, (resource, action, _)) in POLICY.iter().enumerate() {
            let duplicates = POLICY[i + 1..]
                .iter()
                .filter(|(r, a, _)| r == resource && a == action)
                .count();
            assert_eq!(duplicates, 0, "{resource:?}/{action:?} declared twice");
        }
    }
}
