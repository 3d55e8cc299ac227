use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Appointment, AppointmentStatus, AppointmentType, BookingType, DoctorAvailability,
    PatientDetails, Payment, PaymentMethod, PaymentStatus, QueueEvent,
};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) const APPOINTMENT_SELECT: &str =
    "SELECT a.id, a.date, a.serial_number, a.appointment_type, a.booking_type, a.payment_method,
            a.preferred_time, a.arrival_time, a.slot_time, a.status,
            a.patient_name, a.patient_age, a.patient_phone, a.patient_city, a.reason,
            a.created_at, a.updated_at, p.status
     FROM appointments a
     LEFT JOIN payments p ON p.appointment_id = a.id";

pub fn now_timestamp() -> String {
    Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

// ── Appointments ──

pub fn get_appointment(conn: &Connection, id: &str) -> anyhow::Result<Option<Appointment>> {
    let sql = format!("{APPOINTMENT_SELECT} WHERE a.id = ?1");
    let result = conn.query_row(&sql, params![id], |row| Ok(parse_appointment_row(row)));

    match result {
        Ok(appt) => Ok(Some(appt?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// The day's ledger in queue order: GENERAL by serial, then PRIORITY by
/// booking time.
pub fn get_appointments_for_date(
    conn: &Connection,
    date: NaiveDate,
) -> anyhow::Result<Vec<Appointment>> {
    let sql = format!(
        "{APPOINTMENT_SELECT} WHERE a.date = ?1
         ORDER BY a.serial_number IS NULL, a.serial_number ASC, a.created_at ASC, a.id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![date.format(DATE_FORMAT).to_string()], |row| {
        Ok(parse_appointment_row(row))
    })?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

/// Moves `id` from `from` to `to` only if it is still in `from`. Returns
/// false when another writer got there first.
pub fn update_appointment_status(
    conn: &Connection,
    id: &str,
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        params![to.as_str(), now_timestamp(), id, from.as_str()],
    )?;
    Ok(count > 0)
}

/// Administrative override: every non-terminal appointment on `date` goes
/// straight to completed.
pub fn complete_all_for_date(conn: &Connection, date: NaiveDate) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE appointments SET status = 'completed', updated_at = ?1
         WHERE date = ?2 AND status IN ('pending', 'arrived', 'consulting')",
        params![now_timestamp(), date.format(DATE_FORMAT).to_string()],
    )?;
    Ok(count)
}

pub(crate) fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<Appointment> {
    let id: String = row.get(0)?;
    let date_str: String = row.get(1)?;
    let serial_number: Option<u32> = row.get(2)?;
    let appointment_type_str: String = row.get(3)?;
    let booking_type_str: String = row.get(4)?;
    let payment_method_str: String = row.get(5)?;
    let preferred_time: Option<String> = row.get(6)?;
    let arrival_time: Option<String> = row.get(7)?;
    let slot_time: Option<String> = row.get(8)?;
    let status_str: String = row.get(9)?;
    let patient_name: Option<String> = row.get(10)?;
    let patient_age: Option<u8> = row.get(11)?;
    let patient_phone: Option<String> = row.get(12)?;
    let patient_city: Option<String> = row.get(13)?;
    let reason: Option<String> = row.get(14)?;
    let created_at_str: String = row.get(15)?;
    let updated_at_str: String = row.get(16)?;
    let payment_status_str: Option<String> = row.get(17)?;

    let patient = match (patient_name, patient_age, patient_phone, patient_city) {
        (Some(name), Some(age), Some(phone), Some(city)) => Some(PatientDetails {
            name,
            age,
            phone,
            city,
            reason,
        }),
        _ => None,
    };

    let payment_status = match payment_status_str {
        Some(s) => Some(
            PaymentStatus::parse(&s)
                .ok_or_else(|| anyhow::anyhow!("unknown payment status: {s}"))?,
        ),
        None => None,
    };

    Ok(Appointment {
        id,
        date: NaiveDate::parse_from_str(&date_str, DATE_FORMAT)?,
        serial_number,
        appointment_type: AppointmentType::parse(&appointment_type_str)
            .ok_or_else(|| anyhow::anyhow!("unknown appointment type: {appointment_type_str}"))?,
        booking_type: BookingType::parse(&booking_type_str)
            .ok_or_else(|| anyhow::anyhow!("unknown booking type: {booking_type_str}"))?,
        payment_method: PaymentMethod::parse(&payment_method_str)
            .ok_or_else(|| anyhow::anyhow!("unknown payment method: {payment_method_str}"))?,
        preferred_time: parse_time(preferred_time.as_deref())?,
        arrival_time: parse_time(arrival_time.as_deref())?,
        slot_time: parse_time(slot_time.as_deref())?,
        status: AppointmentStatus::parse(&status_str)
            .ok_or_else(|| anyhow::anyhow!("unknown appointment status: {status_str}"))?,
        patient,
        payment_status,
        created_at: parse_timestamp("created_at", &created_at_str)?,
        updated_at: parse_timestamp("updated_at", &updated_at_str)?,
    })
}

fn parse_time(value: Option<&str>) -> anyhow::Result<Option<NaiveTime>> {
    value
        .map(|s| NaiveTime::parse_from_str(s, TIME_FORMAT))
        .transpose()
        .map_err(Into::into)
}

fn parse_timestamp(column: &str, s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .with_context(|| format!("bad {column} timestamp: {s}"))
}

// ── Payments ──

const PAYMENT_SELECT: &str =
    "SELECT id, appointment_id, gateway_order_id, gateway_payment_id, amount_minor, status,
            failure_reason, created_at, updated_at
     FROM payments";

pub fn get_payment_for_appointment(
    conn: &Connection,
    appointment_id: &str,
) -> anyhow::Result<Option<Payment>> {
    let sql = format!("{PAYMENT_SELECT} WHERE appointment_id = ?1");
    conn.query_row(&sql, params![appointment_id], |row| Ok(parse_payment_row(row)))
        .optional()?
        .transpose()
}

pub fn get_payment_by_order(conn: &Connection, order_id: &str) -> anyhow::Result<Option<Payment>> {
    let sql = format!("{PAYMENT_SELECT} WHERE gateway_order_id = ?1");
    conn.query_row(&sql, params![order_id], |row| Ok(parse_payment_row(row)))
        .optional()?
        .transpose()
}

/// Settles a pending payment. Returns false if it was already settled.
pub fn mark_payment_success(
    conn: &Connection,
    order_id: &str,
    gateway_payment_id: &str,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE payments SET status = 'success', gateway_payment_id = ?1, updated_at = ?2
         WHERE gateway_order_id = ?3 AND status = 'pending'",
        params![gateway_payment_id, now_timestamp(), order_id],
    )?;
    Ok(count > 0)
}

pub fn mark_payment_failed(conn: &Connection, order_id: &str, reason: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE payments SET status = 'failed', failure_reason = ?1, updated_at = ?2
         WHERE gateway_order_id = ?3 AND status = 'pending'",
        params![reason, now_timestamp(), order_id],
    )?;
    Ok(count > 0)
}

fn parse_payment_row(row: &rusqlite::Row) -> anyhow::Result<Payment> {
    let status_str: String = row.get(5)?;
    let created_at_str: String = row.get(7)?;
    let updated_at_str: String = row.get(8)?;

    Ok(Payment {
        id: row.get(0)?,
        appointment_id: row.get(1)?,
        gateway_order_id: row.get(2)?,
        gateway_payment_id: row.get(3)?,
        amount_minor: row.get(4)?,
        status: PaymentStatus::parse(&status_str)
            .ok_or_else(|| anyhow::anyhow!("unknown payment status: {status_str}"))?,
        failure_reason: row.get(6)?,
        created_at: parse_timestamp("created_at", &created_at_str)?,
        updated_at: parse_timestamp("updated_at", &updated_at_str)?,
    })
}

// ── Doctor Availability ──

pub fn get_availability(
    conn: &Connection,
    date: NaiveDate,
) -> anyhow::Result<Option<DoctorAvailability>> {
    let row = conn
        .query_row(
            "SELECT available, note, updated_at FROM doctor_availability WHERE date = ?1",
            params![date.format(DATE_FORMAT).to_string()],
            |row| {
                let available: bool = row.get::<_, i32>(0)? != 0;
                let note: Option<String> = row.get(1)?;
                let updated_at: String = row.get(2)?;
                Ok((available, note, updated_at))
            },
        )
        .optional()?;

    row.map(|(available, note, updated_at)| {
        Ok(DoctorAvailability {
            date,
            available,
            note,
            updated_at: parse_timestamp("updated_at", &updated_at)?,
        })
    })
    .transpose()
}

/// Whether the doctor sits on `date`, falling back to `default` when staff
/// have not said either way.
pub fn is_doctor_available(conn: &Connection, date: NaiveDate, default: bool) -> anyhow::Result<bool> {
    Ok(get_availability(conn, date)?
        .map(|a| a.available)
        .unwrap_or(default))
}

pub fn set_availability(
    conn: &Connection,
    date: NaiveDate,
    available: bool,
    note: Option<&str>,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO doctor_availability (date, available, note, updated_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(date) DO UPDATE SET
           available = excluded.available,
           note = excluded.note,
           updated_at = excluded.updated_at",
        params![
            date.format(DATE_FORMAT).to_string(),
            available as i32,
            note,
            now_timestamp(),
        ],
    )?;
    Ok(())
}

// ── Queue Events ──

pub fn insert_queue_event(
    conn: &Connection,
    date: NaiveDate,
    appointment_id: Option<&str>,
    kind: &str,
    detail: &str,
) -> anyhow::Result<QueueEvent> {
    let date_str = date.format(DATE_FORMAT).to_string();
    let created_at = now_timestamp();
    conn.execute(
        "INSERT INTO queue_events (date, appointment_id, kind, detail, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![date_str, appointment_id, kind, detail, created_at],
    )?;
    Ok(QueueEvent {
        id: conn.last_insert_rowid(),
        date: date_str,
        appointment_id: appointment_id.map(str::to_string),
        kind: kind.to_string(),
        detail: detail.to_string(),
        created_at,
    })
}

pub fn get_queue_events_since(
    conn: &Connection,
    since_id: i64,
    date: Option<NaiveDate>,
) -> anyhow::Result<Vec<QueueEvent>> {
    let date_filter = date.map(|d| d.format(DATE_FORMAT).to_string());
    let mut stmt = conn.prepare(
        "SELECT id, date, appointment_id, kind, detail, created_at
         FROM queue_events WHERE id > ?1 AND (?2 IS NULL OR date = ?2)
         ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![since_id, date_filter], |row| {
        Ok(QueueEvent {
            id: row.get(0)?,
            date: row.get(1)?,
            appointment_id: row.get(2)?,
            kind: row.get(3)?,
            detail: row.get(4)?,
            created_at: row.get(5)?,
        })
    })?;

    let mut events = vec![];
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}
