use std::collections::BTreeSet;
use std::thread;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use clinicdesk::db::{self, queries};
use clinicdesk::models::{AppointmentType, NewPayment, OperatingDays};
use clinicdesk::services::admission::{self, AdmissionPolicy, CreateAppointmentRequest};
use clinicdesk::services::booking_window::BookingWindow;
use clinicdesk::services::slots::{OverflowPolicy, SlotPlan};

const WRITERS: usize = 8;
const BOOKINGS_PER_WRITER: usize = 12;

fn policy() -> AdmissionPolicy {
    AdmissionPolicy {
        window: BookingWindow::new(OperatingDays::default()),
        plan: SlotPlan::default(),
        overflow: OverflowPolicy::Clamp,
        doctor_available_by_default: true,
        max_retries: 20,
        general_fee_minor: 20_000,
        priority_fee_minor: 50_000,
    }
}

fn request(appointment_type: &str, payment_method: &str) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        date: Some("2025-06-18".to_string()),
        appointment_type: Some(appointment_type.to_string()),
        payment_method: Some(payment_method.to_string()),
        preferred_time: None,
        patient_name: Some("Kiran Rao".to_string()),
        patient_age: Some(51),
        patient_phone: Some("9000000001".to_string()),
        patient_city: Some("Mysuru".to_string()),
        reason: None,
    }
}

/// Separate connections to one database file, each writing online and
/// walk-in bookings at the same time. The serials that come out must be
/// exactly 1..=N with no gaps or repeats.
#[test]
fn test_concurrent_writers_get_gapless_serials() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let path = path.to_str().unwrap().to_string();

    // schema once, up front
    db::init_db(&path, Duration::from_secs(5)).unwrap();

    let now = NaiveDateTime::parse_from_str("2025-06-17 19:30", "%Y-%m-%d %H:%M").unwrap();
    let general = admission::validate(&request("general", "pay_at_counter")).unwrap();
    let priority = admission::validate(&request("priority", "online")).unwrap();

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let path = path.clone();
            let general = general.clone();
            let priority = priority.clone();
            thread::spawn(move || {
                let conn = db::init_db(&path, Duration::from_secs(5)).unwrap();
                let policy = policy();
                let mut priority_count: usize = 0;
                for i in 0..BOOKINGS_PER_WRITER {
                    match (writer + i) % 3 {
                        0 => {
                            admission::admit_offline(&conn, &policy, now, None).unwrap();
                        }
                        1 => {
                            admission::admit_validated(&conn, &policy, now, &general, None).unwrap();
                        }
                        _ => {
                            admission::admit_validated(
                                &conn,
                                &policy,
                                now,
                                &priority,
                                Some(NewPayment {
                                    gateway_order_id: format!("order_{writer}_{i}"),
                                    amount_minor: 50_000,
                                }),
                            )
                            .unwrap();
                            priority_count += 1;
                        }
                    }
                }
                priority_count
            })
        })
        .collect();

    let priority_total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    let conn = db::init_db(&path, Duration::from_secs(5)).unwrap();
    let date = NaiveDate::from_ymd_opt(2025, 6, 18).unwrap();
    let appointments = queries::get_appointments_for_date(&conn, date).unwrap();
    assert_eq!(appointments.len(), WRITERS * BOOKINGS_PER_WRITER);

    let general_total = WRITERS * BOOKINGS_PER_WRITER - priority_total;
    let serials: Vec<u32> = appointments
        .iter()
        .filter(|a| a.appointment_type == AppointmentType::General)
        .map(|a| a.serial_number.unwrap())
        .collect();
    let unique: BTreeSet<u32> = serials.iter().copied().collect();
    assert_eq!(serials.len(), general_total);
    assert_eq!(unique, (1..=general_total as u32).collect::<BTreeSet<_>>());

    let plan = SlotPlan::default();
    for appt in &appointments {
        match appt.serial_number {
            Some(serial) => {
                assert_eq!(appt.slot_time, Some(plan.compute(serial - 1).slot_time));
            }
            None => assert_eq!(appt.appointment_type, AppointmentType::Priority),
        }
    }
}
