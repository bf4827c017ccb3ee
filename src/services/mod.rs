pub mod admin_service;
pub mod appointment_service;
pub mod auth_service;
pub mod doctor_service;
pub mod mapping;
pub mod user_service;
