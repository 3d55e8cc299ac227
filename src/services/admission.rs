//! Turns booking requests into ledger rows.
//!
//! Every path runs the same gates in the same order (window, target date,
//! doctor availability) before touching the ledger, and re-runs them right
//! before the write when the request had to wait on the payment gateway.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;
use serde::Deserialize;

use crate::config::AppConfig;
use crate::db::ledger::{self, LedgerError};
use crate::db::queries::{self, DATE_FORMAT, TIME_FORMAT};
use crate::errors::{AppError, FieldError};
use crate::models::{
    Appointment, AppointmentType, BookingType, NewAppointment, NewPayment, PatientDetails,
    PaymentMethod,
};
use crate::services::booking_window::BookingWindow;
use crate::services::queue::{self, record_queue_event};
use crate::services::slots::{OverflowPolicy, SlotPlan};
use crate::state::AppState;

const RETRY_BACKOFF_MS: u64 = 25;

const MAX_NAME_LEN: usize = 100;
const MAX_CITY_LEN: usize = 100;
const MAX_REASON_LEN: usize = 500;
const MAX_AGE: i64 = 120;

#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    pub window: BookingWindow,
    pub plan: SlotPlan,
    pub overflow: OverflowPolicy,
    pub doctor_available_by_default: bool,
    pub max_retries: u32,
    pub general_fee_minor: i64,
    pub priority_fee_minor: i64,
}

impl AdmissionPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            window: BookingWindow::new(config.operating_days),
            plan: SlotPlan::default(),
            overflow: config.overflow_policy,
            doctor_available_by_default: config.doctor_available_by_default,
            max_retries: config.assign_max_retries,
            general_fee_minor: config.general_fee_minor,
            priority_fee_minor: config.priority_fee_minor,
        }
    }

    pub fn fee_for(&self, appointment_type: AppointmentType) -> i64 {
        match appointment_type {
            AppointmentType::General => self.general_fee_minor,
            AppointmentType::Priority => self.priority_fee_minor,
        }
    }
}

/// Body of `POST /api/appointments`. Everything is optional at the wire level
/// so that missing fields come back as field errors, not a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAppointmentRequest {
    pub date: Option<String>,
    pub appointment_type: Option<String>,
    pub payment_method: Option<String>,
    pub preferred_time: Option<String>,
    pub patient_name: Option<String>,
    pub patient_age: Option<i64>,
    pub patient_phone: Option<String>,
    pub patient_city: Option<String>,
    pub reason: Option<String>,
}

/// An online request that passed field validation. Gates are still unchecked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBooking {
    pub date: NaiveDate,
    pub appointment_type: AppointmentType,
    pub payment_method: PaymentMethod,
    pub preferred_time: Option<NaiveTime>,
    pub patient: PatientDetails,
}

/// Checks every field and reports all problems at once.
pub fn validate(req: &CreateAppointmentRequest) -> Result<ValidatedBooking, AppError> {
    let mut errors = vec![];

    let date = match non_empty(&req.date) {
        Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map_err(|_| errors.push(FieldError::new("date", "must be a date in YYYY-MM-DD form")))
            .ok(),
        None => {
            errors.push(FieldError::new("date", "is required"));
            None
        }
    };

    let appointment_type = match non_empty(&req.appointment_type) {
        Some(s) => AppointmentType::parse(s).or_else(|| {
            errors.push(FieldError::new("appointment_type", "must be general or priority"));
            None
        }),
        None => {
            errors.push(FieldError::new("appointment_type", "is required"));
            None
        }
    };

    let payment_method = match non_empty(&req.payment_method) {
        Some(s) => PaymentMethod::parse(s).or_else(|| {
            errors.push(FieldError::new("payment_method", "must be online or pay_at_counter"));
            None
        }),
        None => {
            errors.push(FieldError::new("payment_method", "is required"));
            None
        }
    };

    if appointment_type == Some(AppointmentType::Priority)
        && payment_method == Some(PaymentMethod::PayAtCounter)
    {
        errors.push(FieldError::new(
            "payment_method",
            "priority appointments must be paid online",
        ));
    }

    let preferred_time = match non_empty(&req.preferred_time) {
        Some(_) if appointment_type == Some(AppointmentType::General) => {
            errors.push(FieldError::new(
                "preferred_time",
                "only priority appointments take a preferred time",
            ));
            None
        }
        Some(s) => NaiveTime::parse_from_str(s, TIME_FORMAT)
            .map_err(|_| errors.push(FieldError::new("preferred_time", "must be a time in HH:MM form")))
            .ok(),
        None => None,
    };

    let name = required_text(&req.patient_name, "patient_name", MAX_NAME_LEN, &mut errors);
    let city = required_text(&req.patient_city, "patient_city", MAX_CITY_LEN, &mut errors);

    let age = match req.patient_age {
        Some(age) if (0..=MAX_AGE).contains(&age) => u8::try_from(age).ok(),
        Some(_) => {
            errors.push(FieldError::new("patient_age", format!("must be between 0 and {MAX_AGE}")));
            None
        }
        None => {
            errors.push(FieldError::new("patient_age", "is required"));
            None
        }
    };

    let phone = match non_empty(&req.patient_phone) {
        Some(s) if is_valid_phone(s) => Some(s.to_string()),
        Some(_) => {
            errors.push(FieldError::new("patient_phone", "must be 10 to 15 digits"));
            None
        }
        None => {
            errors.push(FieldError::new("patient_phone", "is required"));
            None
        }
    };

    let reason = non_empty(&req.reason).map(str::to_string);
    if reason.as_ref().is_some_and(|r| r.chars().count() > MAX_REASON_LEN) {
        errors.push(FieldError::new(
            "reason",
            format!("must be at most {MAX_REASON_LEN} characters"),
        ));
    }

    match (date, appointment_type, payment_method, name, age, phone, city) {
        (Some(date), Some(appointment_type), Some(payment_method), Some(name), Some(age), Some(phone), Some(city))
            if errors.is_empty() =>
        {
            Ok(ValidatedBooking {
                date,
                appointment_type,
                payment_method,
                preferred_time,
                patient: PatientDetails {
                    name,
                    age,
                    phone,
                    city,
                    reason,
                },
            })
        }
        _ => Err(AppError::Validation(errors)),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn required_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match non_empty(value) {
        Some(s) if s.chars().count() > max_len => {
            errors.push(FieldError::new(field, format!("must be at most {max_len} characters")));
            None
        }
        Some(s) => Some(s.to_string()),
        None => {
            errors.push(FieldError::new(field, "is required"));
            None
        }
    }
}

fn is_valid_phone(s: &str) -> bool {
    let digits = s.strip_prefix('+').unwrap_or(s);
    (10..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

/// Window, target date and doctor availability, in that order. Returns the
/// date bookings are currently open for.
pub fn check_gates(
    conn: &Connection,
    policy: &AdmissionPolicy,
    now: NaiveDateTime,
    date: Option<NaiveDate>,
) -> Result<NaiveDate, AppError> {
    let window = policy.window.evaluate(now);
    let target = match (window.is_open, window.target_date) {
        (true, Some(target)) => target,
        _ => {
            tracing::info!(now = %now, "booking rejected, window closed");
            return Err(AppError::BookingClosed {
                opens_at: window.opens_at,
            });
        }
    };

    let date = date.unwrap_or(target);
    if date != target {
        return Err(AppError::invalid(
            "date",
            format!("bookings are open for {} only", target.format(DATE_FORMAT)),
        ));
    }

    if !queries::is_doctor_available(conn, date, policy.doctor_available_by_default)? {
        tracing::info!(date = %date, "booking rejected, doctor unavailable");
        return Err(AppError::DoctorUnavailable(date));
    }

    Ok(date)
}

fn insert_once(
    conn: &Connection,
    policy: &AdmissionPolicy,
    new: &NewAppointment,
) -> Result<Appointment, LedgerError> {
    match new.appointment_type {
        AppointmentType::General => ledger::insert_general(conn, new, &policy.plan, policy.overflow),
        AppointmentType::Priority => ledger::insert_priority(conn, new),
    }
}

/// Runs `attempt` until it stops conflicting, sleeping `25ms × n` before the
/// n-th retry. After `max_retries` retries the caller gets `AppError::Busy`.
/// `attempt` must not hold any lock across the call boundary; the backoff
/// happens between calls.
fn retry_conflicts<T>(
    max_retries: u32,
    date: NaiveDate,
    mut attempt: impl FnMut() -> Result<T, LedgerError>,
) -> Result<T, AppError> {
    let mut retries = 0;
    loop {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(LedgerError::Conflict) if retries < max_retries => {
                retries += 1;
                tracing::warn!(date = %date, attempt = retries, "ledger conflict, retrying");
                std::thread::sleep(Duration::from_millis(RETRY_BACKOFF_MS * u64::from(retries)));
            }
            Err(LedgerError::Conflict) => {
                tracing::warn!(date = %date, attempts = retries + 1, "ledger still busy, giving up");
                return Err(AppError::Busy);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn log_admitted(appt: &Appointment) {
    tracing::info!(
        appointment_id = %appt.id,
        date = %appt.date,
        serial = ?appt.serial_number,
        appointment_type = appt.appointment_type.as_str(),
        booking_type = appt.booking_type.as_str(),
        "appointment admitted"
    );
}

/// Writes `new` to the ledger, retrying lock conflicts with a linear backoff.
/// Gates must already have passed.
pub fn admit(
    conn: &Connection,
    policy: &AdmissionPolicy,
    new: &NewAppointment,
) -> Result<Appointment, AppError> {
    let appt = retry_conflicts(policy.max_retries, new.date, || insert_once(conn, policy, new))?;
    log_admitted(&appt);
    Ok(appt)
}

/// Same as [`admit`] for the shared connection behind `AppState`. Runs on the
/// blocking pool; the connection lock is held per attempt, never during the
/// backoff.
pub async fn admit_shared(state: &Arc<AppState>, new: NewAppointment) -> Result<Appointment, AppError> {
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || -> Result<Appointment, AppError> {
        let appt = retry_conflicts(state.policy.max_retries, new.date, || {
            let db = state.db();
            insert_once(&db, &state.policy, &new)
        })?;
        log_admitted(&appt);
        Ok(appt)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("admission task failed: {e}")))?
}

fn online_appointment(
    date: NaiveDate,
    booking: &ValidatedBooking,
    payment: Option<NewPayment>,
) -> NewAppointment {
    NewAppointment {
        date,
        appointment_type: booking.appointment_type,
        booking_type: BookingType::Online,
        payment_method: booking.payment_method,
        preferred_time: booking.preferred_time,
        patient: Some(booking.patient.clone()),
        payment,
    }
}

fn walk_in_appointment(date: NaiveDate) -> NewAppointment {
    NewAppointment {
        date,
        appointment_type: AppointmentType::General,
        booking_type: BookingType::Offline,
        payment_method: PaymentMethod::PayAtCounter,
        preferred_time: None,
        patient: None,
        payment: None,
    }
}

/// Gates and writes an already validated online booking.
pub fn admit_validated(
    conn: &Connection,
    policy: &AdmissionPolicy,
    now: NaiveDateTime,
    booking: &ValidatedBooking,
    payment: Option<NewPayment>,
) -> Result<Appointment, AppError> {
    let date = check_gates(conn, policy, now, Some(booking.date))?;
    admit(conn, policy, &online_appointment(date, booking, payment))
}

/// Walk-in GENERAL booking from reception. No patient details, paid at the
/// counter. `date` defaults to the date bookings are open for.
pub fn admit_offline(
    conn: &Connection,
    policy: &AdmissionPolicy,
    now: NaiveDateTime,
    date: Option<NaiveDate>,
) -> Result<Appointment, AppError> {
    let date = check_gates(conn, policy, now, date)?;
    admit(conn, policy, &walk_in_appointment(date))
}

/// Reception walk-in through the shared connection.
pub async fn admit_walk_in(
    state: &Arc<AppState>,
    date: Option<NaiveDate>,
) -> Result<Appointment, AppError> {
    let date = {
        let db = state.db();
        check_gates(&db, &state.policy, state.clock.now(), date)?
    };
    let appt = admit_shared(state, walk_in_appointment(date)).await?;
    record_queue_event(state, appt.date, Some(&appt.id), queue::BOOKED, &describe(&appt));
    Ok(appt)
}

/// Full online flow. The gateway order is opened without holding the
/// database lock; gates are checked again before the write.
pub async fn admit_online(
    state: &Arc<AppState>,
    req: &CreateAppointmentRequest,
) -> Result<Appointment, AppError> {
    let booking = validate(req)?;

    {
        let db = state.db();
        check_gates(&db, &state.policy, state.clock.now(), Some(booking.date))?;
    }

    let payment = match booking.payment_method {
        PaymentMethod::Online => {
            let receipt = uuid::Uuid::new_v4().to_string();
            let amount_minor = state.policy.fee_for(booking.appointment_type);
            let gateway_order_id = state
                .payments
                .create_order(&receipt, amount_minor)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "failed to create payment order");
                    AppError::Gateway(e.to_string())
                })?;
            Some(NewPayment {
                gateway_order_id,
                amount_minor,
            })
        }
        PaymentMethod::PayAtCounter => None,
    };

    let date = {
        let db = state.db();
        check_gates(&db, &state.policy, state.clock.now(), Some(booking.date))?
    };
    let appt = admit_shared(state, online_appointment(date, &booking, payment)).await?;

    record_queue_event(state, appt.date, Some(&appt.id), queue::BOOKED, &describe(&appt));
    Ok(appt)
}

pub fn describe(appt: &Appointment) -> String {
    match appt.serial_number {
        Some(serial) => format!("{} general #{serial}", appt.booking_type.as_str()),
        None => format!("{} priority", appt.booking_type.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{AppointmentStatus, OperatingDays};

    fn setup_db() -> Connection {
        db::init_db(":memory:", Duration::from_millis(100)).unwrap()
    }

    fn policy() -> AdmissionPolicy {
        AdmissionPolicy {
            window: BookingWindow::new(OperatingDays::default()),
            plan: SlotPlan::default(),
            overflow: OverflowPolicy::Clamp,
            doctor_available_by_default: true,
            max_retries: 3,
            general_fee_minor: 20_000,
            priority_fee_minor: 50_000,
        }
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn request() -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            date: Some("2025-06-18".to_string()),
            appointment_type: Some("general".to_string()),
            payment_method: Some("pay_at_counter".to_string()),
            preferred_time: None,
            patient_name: Some("Ravi Kumar".to_string()),
            patient_age: Some(42),
            patient_phone: Some("+919876543210".to_string()),
            patient_city: Some("Nagpur".to_string()),
            reason: Some("fever".to_string()),
        }
    }

    fn field_names(err: AppError) -> Vec<String> {
        match err {
            AppError::Validation(fields) => fields.into_iter().map(|f| f.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_accepts_complete_request() {
        let booking = validate(&request()).unwrap();
        assert_eq!(booking.date, date("2025-06-18"));
        assert_eq!(booking.appointment_type, AppointmentType::General);
        assert_eq!(booking.patient.age, 42);
        assert_eq!(booking.patient.reason.as_deref(), Some("fever"));
    }

    #[test]
    fn test_validate_reports_every_bad_field() {
        let req = CreateAppointmentRequest {
            patient_name: Some("   ".to_string()),
            patient_age: Some(130),
            patient_phone: Some("12345".to_string()),
            patient_city: None,
            ..request()
        };
        let fields = field_names(validate(&req).unwrap_err());
        assert_eq!(fields, vec!["patient_name", "patient_city", "patient_age", "patient_phone"]);
    }

    #[test]
    fn test_validate_priority_rules() {
        let req = CreateAppointmentRequest {
            appointment_type: Some("priority".to_string()),
            payment_method: Some("pay_at_counter".to_string()),
            ..request()
        };
        assert_eq!(field_names(validate(&req).unwrap_err()), vec!["payment_method"]);

        let req = CreateAppointmentRequest {
            preferred_time: Some("12:30".to_string()),
            ..request()
        };
        assert_eq!(field_names(validate(&req).unwrap_err()), vec!["preferred_time"]);

        let req = CreateAppointmentRequest {
            appointment_type: Some("priority".to_string()),
            payment_method: Some("online".to_string()),
            preferred_time: Some("12:30".to_string()),
            ..request()
        };
        let booking = validate(&req).unwrap();
        assert_eq!(booking.preferred_time, NaiveTime::from_hms_opt(12, 30, 0));
    }

    #[test]
    fn test_validate_bad_enums_and_date() {
        let req = CreateAppointmentRequest {
            date: Some("18/06/2025".to_string()),
            appointment_type: Some("urgent".to_string()),
            payment_method: Some("cash".to_string()),
            ..request()
        };
        assert_eq!(
            field_names(validate(&req).unwrap_err()),
            vec!["date", "appointment_type", "payment_method"]
        );
    }

    #[test]
    fn test_closed_window_rejects_before_writing() {
        let conn = setup_db();
        let booking = validate(&request()).unwrap();
        let err = admit_validated(&conn, &policy(), at("2025-06-17 12:00"), &booking, None).unwrap_err();
        assert!(matches!(err, AppError::BookingClosed { opens_at: Some(_) }));

        let err = admit_offline(&conn, &policy(), at("2025-06-17 12:00"), None).unwrap_err();
        assert!(matches!(err, AppError::BookingClosed { .. }));
        assert_eq!(ledger::count_general(&conn, date("2025-06-18")).unwrap(), 0);
    }

    #[test]
    fn test_date_must_match_target() {
        let conn = setup_db();
        let req = CreateAppointmentRequest {
            date: Some("2025-06-19".to_string()),
            ..request()
        };
        let booking = validate(&req).unwrap();
        let err = admit_validated(&conn, &policy(), at("2025-06-17 18:00"), &booking, None).unwrap_err();
        assert_eq!(field_names(err), vec!["date"]);
    }

    #[test]
    fn test_unavailable_doctor_blocks_both_paths() {
        let conn = setup_db();
        queries::set_availability(&conn, date("2025-06-18"), false, Some("conference")).unwrap();
        let booking = validate(&request()).unwrap();

        let err = admit_validated(&conn, &policy(), at("2025-06-17 18:00"), &booking, None).unwrap_err();
        assert!(matches!(err, AppError::DoctorUnavailable(_)));
        let err = admit_offline(&conn, &policy(), at("2025-06-17 18:00"), None).unwrap_err();
        assert!(matches!(err, AppError::DoctorUnavailable(_)));
    }

    #[test]
    fn test_default_availability_is_configurable() {
        let conn = setup_db();
        let closed_by_default = AdmissionPolicy {
            doctor_available_by_default: false,
            ..policy()
        };
        let err = admit_offline(&conn, &closed_by_default, at("2025-06-17 18:00"), None).unwrap_err();
        assert!(matches!(err, AppError::DoctorUnavailable(_)));

        queries::set_availability(&conn, date("2025-06-18"), true, None).unwrap();
        assert!(admit_offline(&conn, &closed_by_default, at("2025-06-17 18:00"), None).is_ok());
    }

    #[test]
    fn test_online_and_offline_share_serials() {
        let conn = setup_db();
        let now = at("2025-06-17 18:00");
        let booking = validate(&request()).unwrap();

        let first = admit_validated(&conn, &policy(), now, &booking, None).unwrap();
        let walk_in = admit_offline(&conn, &policy(), now, None).unwrap();
        let second = admit_validated(&conn, &policy(), now, &booking, None).unwrap();

        assert_eq!(first.serial_number, Some(1));
        assert_eq!(walk_in.serial_number, Some(2));
        assert_eq!(second.serial_number, Some(3));
        assert_eq!(walk_in.booking_type, BookingType::Offline);
        assert_eq!(walk_in.payment_method, PaymentMethod::PayAtCounter);
        assert!(walk_in.patient.is_none());
        assert_eq!(walk_in.status, AppointmentStatus::Pending);
        assert_eq!(walk_in.slot_time, NaiveTime::from_hms_opt(11, 0, 0));
    }

    #[test]
    fn test_locked_ledger_gives_up_as_busy_without_spending_a_serial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let path = path.to_str().unwrap();
        let conn = db::init_db(path, Duration::from_millis(50)).unwrap();
        let blocker = db::init_db(path, Duration::from_millis(50)).unwrap();
        let policy = AdmissionPolicy {
            max_retries: 2,
            ..policy()
        };
        let now = at("2025-06-17 18:00");

        blocker.execute_batch("BEGIN IMMEDIATE").unwrap();
        let err = admit_offline(&conn, &policy, now, None).unwrap_err();
        assert!(matches!(err, AppError::Busy));
        assert_eq!(ledger::count_general(&conn, date("2025-06-18")).unwrap(), 0);

        blocker.execute_batch("COMMIT").unwrap();
        let appt = admit_offline(&conn, &policy, now, None).unwrap();
        assert_eq!(appt.serial_number, Some(1));
        assert_eq!(ledger::count_general(&conn, date("2025-06-18")).unwrap(), 1);
    }

    #[test]
    fn test_retry_stops_at_the_limit() {
        let mut calls = 0;
        let ok = retry_conflicts(2, date("2025-06-18"), || {
            calls += 1;
            if calls < 3 {
                Err(LedgerError::Conflict)
            } else {
                Ok(calls)
            }
        });
        assert_eq!(ok.unwrap(), 3);

        let mut calls = 0;
        let err = retry_conflicts(1, date("2025-06-18"), || -> Result<(), LedgerError> {
            calls += 1;
            Err(LedgerError::Conflict)
        })
        .unwrap_err();
        assert!(matches!(err, AppError::Busy));
        assert_eq!(calls, 2);

        let mut calls = 0;
        let err = retry_conflicts(5, date("2025-06-18"), || -> Result<(), LedgerError> {
            calls += 1;
            Err(LedgerError::CapacityExhausted(date("2025-06-18")))
        })
        .unwrap_err();
        assert!(matches!(err, AppError::CapacityExhausted(_)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_priority_does_not_shift_general_serials() {
        let conn = setup_db();
        let now = at("2025-06-17 18:00");
        let general = validate(&request()).unwrap();
        let priority = validate(&CreateAppointmentRequest {
            appointment_type: Some("priority".to_string()),
            payment_method: Some("online".to_string()),
            ..request()
        })
        .unwrap();

        admit_validated(&conn, &policy(), now, &general, None).unwrap();
        let p = admit_validated(
            &conn,
            &policy(),
            now,
            &priority,
            Some(NewPayment {
                gateway_order_id: "order_p".to_string(),
                amount_minor: 50_000,
            }),
        )
        .unwrap();
        let g = admit_validated(&conn, &policy(), now, &general, None).unwrap();

        assert_eq!(p.serial_number, None);
        assert_eq!(g.serial_number, Some(2));
    }

    #[test]
    fn test_reject_policy_surfaces_capacity_error() {
        let conn = setup_db();
        let tight = AdmissionPolicy {
            plan: SlotPlan {
                per_slot: 1,
                last_slot: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
                ..SlotPlan::default()
            },
            overflow: OverflowPolicy::Reject,
            ..policy()
        };
        let now = at("2025-06-17 18:00");
        admit_offline(&conn, &tight, now, None).unwrap();
        let err = admit_offline(&conn, &tight, now, None).unwrap_err();
        assert!(matches!(err, AppError::CapacityExhausted(_)));
    }

    #[test]
    fn test_morning_window_books_today() {
        let conn = setup_db();
        let appt = admit_offline(&conn, &policy(), at("2025-06-18 07:45"), None).unwrap();
        assert_eq!(appt.date, date("2025-06-18"));
    }

    #[test]
    fn test_phone_format() {
        assert!(is_valid_phone("9876543210"));
        assert!(is_valid_phone("+919876543210"));
        assert!(!is_valid_phone("98765-43210"));
        assert!(!is_valid_phone("+1234"));
        assert!(!is_valid_phone("1234567890123456"));
    }
}
