use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Appointment, AppointmentStatus};

/// Single-step moves an appointment may make. Terminal states have none.
pub fn valid_transitions(current: AppointmentStatus) -> &'static [AppointmentStatus] {
    use AppointmentStatus::*;
    match current {
        Pending => &[Arrived, Cancelled],
        Arrived => &[Consulting, Cancelled],
        Consulting => &[Completed, Cancelled],
        Completed | Cancelled => &[],
    }
}

pub fn validate_transition(from: AppointmentStatus, to: AppointmentStatus) -> Result<(), AppError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        tracing::warn!(from = %from, to = %to, "invalid status transition attempted");
        Err(AppError::InvalidTransition { from, to })
    }
}

/// Applies one transition. A concurrent change between read and write is
/// re-validated against the fresh status rather than overwritten.
pub fn transition(
    conn: &Connection,
    id: &str,
    to: AppointmentStatus,
) -> Result<Appointment, AppError> {
    for _ in 0..3 {
        let appt = queries::get_appointment(conn, id)?
            .ok_or_else(|| AppError::NotFound(format!("appointment {id}")))?;

        validate_transition(appt.status, to)?;

        if queries::update_appointment_status(conn, id, appt.status, to)? {
            tracing::info!(appointment_id = %id, from = %appt.status, to = %to, "appointment status changed");
            return queries::get_appointment(conn, id)?
                .ok_or_else(|| AppError::NotFound(format!("appointment {id}")));
        }
    }
    Err(AppError::Busy)
}

/// Closes out the day: every pending, arrived or consulting appointment on
/// `date` becomes completed in one statement. Returns how many changed.
pub fn complete_all_for_date(conn: &Connection, date: NaiveDate) -> Result<usize, AppError> {
    let count = queries::complete_all_for_date(conn, date)?;
    tracing::info!(date = %date, count, "completed remaining appointments");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::db::{self, ledger};
    use crate::models::{AppointmentType, BookingType, NewAppointment, PaymentMethod};
    use crate::services::slots::{OverflowPolicy, SlotPlan};
    use AppointmentStatus::*;

    fn setup_db() -> Connection {
        db::init_db(":memory:", Duration::from_millis(100)).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 18).unwrap()
    }

    fn book(conn: &Connection) -> Appointment {
        let new = NewAppointment {
            date: date(),
            appointment_type: AppointmentType::General,
            booking_type: BookingType::Offline,
            payment_method: PaymentMethod::PayAtCounter,
            preferred_time: None,
            patient: None,
            payment: None,
        };
        ledger::insert_general(conn, &new, &SlotPlan::default(), OverflowPolicy::Clamp).unwrap()
    }

    #[test]
    fn test_transition_table() {
        assert!(validate_transition(Pending, Arrived).is_ok());
        assert!(validate_transition(Arrived, Consulting).is_ok());
        assert!(validate_transition(Consulting, Completed).is_ok());
        for from in [Pending, Arrived, Consulting] {
            assert!(validate_transition(from, Cancelled).is_ok());
        }

        assert!(validate_transition(Pending, Consulting).is_err());
        assert!(validate_transition(Pending, Completed).is_err());
        assert!(validate_transition(Consulting, Pending).is_err());
        assert!(validate_transition(Arrived, Pending).is_err());
        assert!(validate_transition(Pending, Pending).is_err());
        for to in [Pending, Arrived, Consulting, Completed, Cancelled] {
            assert!(validate_transition(Completed, to).is_err());
            assert!(validate_transition(Cancelled, to).is_err());
        }
    }

    #[test]
    fn test_walk_through_visit() {
        let conn = setup_db();
        let appt = book(&conn);
        assert_eq!(transition(&conn, &appt.id, Arrived).unwrap().status, Arrived);
        assert_eq!(transition(&conn, &appt.id, Consulting).unwrap().status, Consulting);
        assert_eq!(transition(&conn, &appt.id, Completed).unwrap().status, Completed);

        let err = transition(&conn, &appt.id, Cancelled).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { from: Completed, to: Cancelled }));
    }

    #[test]
    fn test_skip_is_rejected_without_mutation() {
        let conn = setup_db();
        let appt = book(&conn);
        let err = transition(&conn, &appt.id, Consulting).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { from: Pending, to: Consulting }));
        let stored = queries::get_appointment(&conn, &appt.id).unwrap().unwrap();
        assert_eq!(stored.status, Pending);
        // serial and slot never move
        assert_eq!(stored.serial_number, appt.serial_number);
        assert_eq!(stored.slot_time, appt.slot_time);
    }

    #[test]
    fn test_unknown_appointment() {
        let conn = setup_db();
        assert!(matches!(transition(&conn, "missing", Arrived), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_complete_all_skips_terminal_rows() {
        let conn = setup_db();
        let pending = book(&conn);
        let arrived = book(&conn);
        let consulting = book(&conn);
        let cancelled = book(&conn);
        let done = book(&conn);

        transition(&conn, &arrived.id, Arrived).unwrap();
        transition(&conn, &consulting.id, Arrived).unwrap();
        transition(&conn, &consulting.id, Consulting).unwrap();
        transition(&conn, &cancelled.id, Cancelled).unwrap();
        for s in [Arrived, Consulting, Completed] {
            transition(&conn, &done.id, s).unwrap();
        }

        assert_eq!(complete_all_for_date(&conn, date()).unwrap(), 3);

        let status = |id: &str| queries::get_appointment(&conn, id).unwrap().unwrap().status;
        assert_eq!(status(&pending.id), Completed);
        assert_eq!(status(&arrived.id), Completed);
        assert_eq!(status(&consulting.id), Completed);
        assert_eq!(status(&cancelled.id), Cancelled);
        assert_eq!(status(&done.id), Completed);

        assert_eq!(complete_all_for_date(&conn, date()).unwrap(), 0);
    }
}
