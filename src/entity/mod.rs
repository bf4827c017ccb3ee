pub mod appointments;
pub mod availability_entries;
pub mod doctor_profiles;
pub mod users;

pub use appointments::Entity as Appointments;
pub use availability_entries::Entity as AvailabilityEntries;
pub use doctor_profiles::Entity as DoctorProfiles;
pub use users::Entity as Users;
