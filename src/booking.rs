//! Slot-booking rules.
//!
//! Everything here is pure: callers pass in the current instant and whatever
//! they loaded from storage, and get back either `Ok` or the
//! [`BookingRejection`] that applies. The transactional procedure that feeds
//! these checks lives in `services::appointment_service`.

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use thiserror::Error;

use crate::{
    error::AppError,
    models::{AppointmentStatus, AvailabilityEntry},
};

pub const MAX_ADVANCE_MONTHS: u32 = 6;
pub const CANCELLATION_WINDOW_HOURS: i64 = 24;
pub const TIME_LABEL_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BookingRejection {
    #[error("Cannot book appointments in the past")]
    InThePast,

    #[error("Cannot book appointments more than 6 months in advance")]
    TooFarInAdvance,

    #[error("Selected slot is not available")]
    SlotNotAvailable,

    #[error("Slot already booked by another patient")]
    SlotTaken,

    #[error("Appointment already cancelled")]
    AlreadyCancelled,

    #[error("Cannot cancel within 24 hours of appointment")]
    InsideCancellationWindow,
}

impl From<BookingRejection> for AppError {
    fn from(rejection: BookingRejection) -> Self {
        match rejection {
            BookingRejection::SlotNotAvailable | BookingRejection::SlotTaken => {
                AppError::conflict(rejection.to_string())
            }
            BookingRejection::InThePast
            | BookingRejection::TooFarInAdvance
            | BookingRejection::AlreadyCancelled
            | BookingRejection::InsideCancellationWindow => {
                AppError::bad_request(rejection.to_string())
            }
        }
    }
}

/// Latest bookable day for a request made on `today`.
///
/// Month arithmetic clamps to the end of the month, so Aug 31 allows up to Feb 28/29.
pub fn latest_bookable_date(today: NaiveDate) -> NaiveDate {
    today
        .checked_add_months(Months::new(MAX_ADVANCE_MONTHS))
        .unwrap_or(NaiveDate::MAX)
}

/// Day-granularity window check: not before today, not beyond six months out.
pub fn check_booking_window(date: NaiveDate, today: NaiveDate) -> Result<(), BookingRejection> {
    if date < today {
        return Err(BookingRejection::InThePast);
    }
    if date > latest_bookable_date(today) {
        return Err(BookingRejection::TooFarInAdvance);
    }
    Ok(())
}

pub fn slot_is_published(availability: &[AvailabilityEntry], date: NaiveDate, time: &str) -> bool {
    availability
        .iter()
        .any(|entry| entry.date == date && entry.slots.iter().any(|slot| slot == time))
}

pub fn ensure_slot_published(
    availability: &[AvailabilityEntry],
    date: NaiveDate,
    time: &str,
) -> Result<(), BookingRejection> {
    if slot_is_published(availability, date, time) {
        Ok(())
    } else {
        Err(BookingRejection::SlotNotAvailable)
    }
}

pub fn parse_time_label(label: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(label.trim(), TIME_LABEL_FORMAT).ok()
}

/// Start of an appointment in UTC. Labels that are not `HH:MM` start at midnight.
pub fn appointment_starts_at(date: NaiveDate, time: &str) -> NaiveDateTime {
    date.and_time(parse_time_label(time).unwrap_or(NaiveTime::MIN))
}

pub fn ensure_cancellable(
    status: AppointmentStatus,
    date: NaiveDate,
    time: &str,
    now: DateTime<Utc>,
) -> Result<(), BookingRejection> {
    if status == AppointmentStatus::Cancelled {
        return Err(BookingRejection::AlreadyCancelled);
    }

    let starts_at = appointment_starts_at(date, time).and_utc();
    if starts_at - now < Duration::hours(CANCELLATION_WINDOW_HOURS) {
        return Err(BookingRejection::InsideCancellationWindow);
    }
    Ok(())
}

/// Trims, validates and de-duplicates slot labels, keeping first-seen order.
pub fn normalize_slots<I, S>(slots: I) -> Result<Vec<String>, AppError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for slot in slots {
        let slot = slot.as_ref().trim();
        if parse_time_label(slot).is_none() || slot.len() != 5 {
            return Err(AppError::bad_request(format!(
                "Invalid slot `{slot}`, expected HH:MM"
            )));
        }
        if !normalized.iter().any(|existing| existing == slot) {
            normalized.push(slot.to_string());
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn schedule() -> Vec<AvailabilityEntry> {
        vec![AvailabilityEntry {
            date: day(2025, 7, 1),
            slots: vec!["09:00".into(), "10:00".into()],
        }]
    }

    #[test]
    fn today_is_bookable_yesterday_is_not() {
        let today = day(2025, 6, 15);
        assert_eq!(check_booking_window(today, today), Ok(()));
        assert_eq!(
            check_booking_window(day(2025, 6, 14), today),
            Err(BookingRejection::InThePast)
        );
    }

    #[test]
    fn six_months_is_the_upper_bound() {
        let today = day(2025, 1, 10);
        assert_eq!(check_booking_window(day(2025, 7, 10), today), Ok(()));
        assert_eq!(
            check_booking_window(day(2025, 7, 11), today),
            Err(BookingRejection::TooFarInAdvance)
        );
    }

    #[test]
    fn upper_bound_clamps_to_month_end() {
        assert_eq!(latest_bookable_date(day(2025, 8, 31)), day(2026, 2, 28));
    }

    #[test]
    fn published_slot_is_found() {
        assert_eq!(
            ensure_slot_published(&schedule(), day(2025, 7, 1), "09:00"),
            Ok(())
        );
    }

    #[test]
    fn unpublished_label_is_rejected() {
        assert_eq!(
            ensure_slot_published(&schedule(), day(2025, 7, 1), "23:59"),
            Err(BookingRejection::SlotNotAvailable)
        );
    }

    #[test]
    fn date_without_entry_is_rejected() {
        assert_eq!(
            ensure_slot_published(&schedule(), day(2025, 7, 2), "09:00"),
            Err(BookingRejection::SlotNotAvailable)
        );
        assert!(!slot_is_published(&[], day(2025, 7, 1), "09:00"));
    }

    #[test]
    fn cancellation_inside_window_fails() {
        let now = Utc.with_ymd_and_hms(2025, 7, 1, 8, 0, 0).unwrap();
        assert_eq!(
            ensure_cancellable(AppointmentStatus::Booked, day(2025, 7, 2), "07:59", now),
            Err(BookingRejection::InsideCancellationWindow)
        );
    }

    #[test]
    fn cancellation_exactly_24_hours_ahead_is_allowed() {
        let now = Utc.with_ymd_and_hms(2025, 7, 1, 8, 0, 0).unwrap();
        assert_eq!(
            ensure_cancellable(AppointmentStatus::Booked, day(2025, 7, 2), "08:00", now),
            Ok(())
        );
    }

    #[test]
    fn cancelled_appointment_cannot_be_cancelled_again() {
        let now = Utc.with_ymd_and_hms(2025, 7, 1, 8, 0, 0).unwrap();
        assert_eq!(
            ensure_cancellable(AppointmentStatus::Cancelled, day(2025, 9, 1), "10:00", now),
            Err(BookingRejection::AlreadyCancelled)
        );
    }

    #[test]
    fn unparseable_label_starts_at_midnight() {
        assert_eq!(
            appointment_starts_at(day(2025, 7, 1), "morning"),
            day(2025, 7, 1).and_hms_opt(0, 0, 0).unwrap()
        );
    }

    #[test]
    fn rejections_map_to_expected_status() {
        use axum::http::StatusCode;

        assert_eq!(
            AppError::from(BookingRejection::SlotTaken).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(BookingRejection::SlotNotAvailable).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(BookingRejection::InThePast).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn slots_are_trimmed_and_deduplicated() {
        let slots = normalize_slots([" 09:00", "10:30", "09:00"]).unwrap();
        assert_eq!(slots, vec!["09:00".to_string(), "10:30".to_string()]);
    }

    #[test]
    fn malformed_slots_are_rejected() {
        assert!(normalize_slots(["9am"]).is_err());
        assert!(normalize_slots(["25:00"]).is_err());
        assert!(normalize_slots(["9:00"]).is_err());
    }
}
