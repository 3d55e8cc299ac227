//! Write side of the appointment ledger.
//!
//! GENERAL bookings take their serial from the count of GENERAL rows already
//! on the date. Count, slot computation and insert run in one
//! `BEGIN IMMEDIATE` transaction, so two writers can never read the same
//! count; the partial unique index on `(date, serial_number)` backs this up.
//! Nothing here checks gates: callers do that before coming in.

use chrono::{NaiveDate, Utc};
use rusqlite::{ffi, params, Connection, ErrorCode, Transaction, TransactionBehavior};

use super::queries::{DATE_FORMAT, TIMESTAMP_FORMAT, TIME_FORMAT};
use crate::models::{Appointment, AppointmentStatus, AppointmentType, NewAppointment, PaymentStatus};
use crate::services::slots::{OverflowPolicy, SlotAssignment, SlotPlan};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Another writer held the lock past the busy timeout, or won the race
    /// for the serial. Safe to retry.
    #[error("ledger busy, another booking is being written")]
    Conflict,

    #[error("no general capacity left on {0}")]
    CapacityExhausted(NaiveDate),

    #[error("appointment type does not match ledger path")]
    WrongType,

    #[error("database error: {0}")]
    Database(rusqlite::Error),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        if is_conflict(&err) {
            LedgerError::Conflict
        } else {
            LedgerError::Database(err)
        }
    }
}

fn is_conflict(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, msg) => match e.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => true,
            ErrorCode::ConstraintViolation => {
                e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    && msg.as_deref().is_some_and(|m| m.contains("serial_number"))
            }
            _ => false,
        },
        _ => false,
    }
}

pub fn count_general(conn: &Connection, date: NaiveDate) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM appointments WHERE date = ?1 AND appointment_type = 'general'",
        params![date.format(DATE_FORMAT).to_string()],
        |row| row.get(0),
    )
}

/// Assigns the next serial on `new.date` and writes the row (and its payment,
/// if any) as one unit.
pub fn insert_general(
    conn: &Connection,
    new: &NewAppointment,
    plan: &SlotPlan,
    policy: OverflowPolicy,
) -> Result<Appointment, LedgerError> {
    if new.appointment_type != AppointmentType::General {
        return Err(LedgerError::WrongType);
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let existing = count_general(&tx, new.date)?;
    let slot = plan.compute(existing);

    if slot.overflowed {
        match policy {
            OverflowPolicy::Reject => return Err(LedgerError::CapacityExhausted(new.date)),
            OverflowPolicy::Clamp => tracing::warn!(
                date = %new.date,
                serial = slot.serial_number,
                "general slots exhausted, clamping onto closing slot"
            ),
        }
    }

    let appt = build_appointment(new, Some(slot));
    write_rows(&tx, new, &appt)?;
    tx.commit()?;

    Ok(appt)
}

/// Writes a PRIORITY booking. No serial, no capacity.
pub fn insert_priority(conn: &Connection, new: &NewAppointment) -> Result<Appointment, LedgerError> {
    if new.appointment_type != AppointmentType::Priority {
        return Err(LedgerError::WrongType);
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let appt = build_appointment(new, None);
    write_rows(&tx, new, &appt)?;
    tx.commit()?;

    Ok(appt)
}

fn build_appointment(new: &NewAppointment, slot: Option<SlotAssignment>) -> Appointment {
    let now = Utc::now().naive_utc();
    Appointment {
        id: uuid::Uuid::new_v4().to_string(),
        date: new.date,
        serial_number: slot.map(|s| s.serial_number),
        appointment_type: new.appointment_type,
        booking_type: new.booking_type,
        payment_method: new.payment_method,
        preferred_time: new.preferred_time,
        arrival_time: slot.map(|s| s.arrival_time),
        slot_time: slot.map(|s| s.slot_time),
        status: AppointmentStatus::Pending,
        patient: new.patient.clone(),
        payment_status: new.payment.as_ref().map(|_| PaymentStatus::Pending),
        created_at: now,
        updated_at: now,
    }
}

fn write_rows(tx: &Transaction, new: &NewAppointment, appt: &Appointment) -> rusqlite::Result<()> {
    let created_at = appt.created_at.format(TIMESTAMP_FORMAT).to_string();
    let patient = appt.patient.as_ref();

    tx.execute(
        "INSERT INTO appointments (id, date, serial_number, appointment_type, booking_type,
            payment_method, preferred_time, arrival_time, slot_time, status,
            patient_name, patient_age, patient_phone, patient_city, reason, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)",
        params![
            appt.id,
            appt.date.format(DATE_FORMAT).to_string(),
            appt.serial_number,
            appt.appointment_type.as_str(),
            appt.booking_type.as_str(),
            appt.payment_method.as_str(),
            appt.preferred_time.map(|t| t.format(TIME_FORMAT).to_string()),
            appt.arrival_time.map(|t| t.format(TIME_FORMAT).to_string()),
            appt.slot_time.map(|t| t.format(TIME_FORMAT).to_string()),
            appt.status.as_str(),
            patient.map(|p| p.name.as_str()),
            patient.map(|p| p.age),
            patient.map(|p| p.phone.as_str()),
            patient.map(|p| p.city.as_str()),
            patient.and_then(|p| p.reason.as_deref()),
            created_at,
        ],
    )?;

    if let Some(payment) = &new.payment {
        tx.execute(
            "INSERT INTO payments (id, appointment_id, gateway_order_id, amount_minor, status,
                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?5)",
            params![
                uuid::Uuid::new_v4().to_string(),
                appt.id,
                payment.gateway_order_id,
                payment.amount_minor,
                created_at,
            ],
        )?;
    }

    Ok(())
}
