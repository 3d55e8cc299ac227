use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::payment::PaymentStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub date: NaiveDate,
    pub serial_number: Option<u32>,
    pub appointment_type: AppointmentType,
    pub booking_type: BookingType,
    pub payment_method: PaymentMethod,
    pub preferred_time: Option<NaiveTime>,
    pub arrival_time: Option<NaiveTime>,
    pub slot_time: Option<NaiveTime>,
    pub status: AppointmentStatus,
    pub patient: Option<PatientDetails>,
    /// Status of the linked payment, if the appointment has one.
    pub payment_status: Option<PaymentStatus>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Appointment {
    pub fn confirmation(&self) -> Confirmation {
        match (self.payment_method, self.payment_status) {
            (PaymentMethod::PayAtCounter, _) => Confirmation::Confirmed,
            (PaymentMethod::Online, Some(PaymentStatus::Success)) => Confirmation::Confirmed,
            (PaymentMethod::Online, Some(PaymentStatus::Failed)) => Confirmation::PaymentFailed,
            (PaymentMethod::Online, _) => Confirmation::AwaitingPayment,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientDetails {
    pub name: String,
    pub age: u8,
    pub phone: String,
    pub city: String,
    pub reason: Option<String>,
}

/// Everything needed to write a fresh ledger row. Serial and slot times are
/// filled in by the ledger, never by the caller.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub date: NaiveDate,
    pub appointment_type: AppointmentType,
    pub booking_type: BookingType,
    pub payment_method: PaymentMethod,
    pub preferred_time: Option<NaiveTime>,
    pub patient: Option<PatientDetails>,
    pub payment: Option<NewPayment>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub gateway_order_id: String,
    pub amount_minor: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    General,
    Priority,
}

impl AppointmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentType::General => "general",
            AppointmentType::Priority => "priority",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "general" => Some(AppointmentType::General),
            "priority" => Some(AppointmentType::Priority),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingType {
    Online,
    Offline,
}

impl BookingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingType::Online => "online",
            BookingType::Offline => "offline",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(BookingType::Online),
            "offline" => Some(BookingType::Offline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Online,
    PayAtCounter,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Online => "online",
            PaymentMethod::PayAtCounter => "pay_at_counter",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(PaymentMethod::Online),
            "pay_at_counter" => Some(PaymentMethod::PayAtCounter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Arrived,
    Consulting,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Arrived => "arrived",
            AppointmentStatus::Consulting => "consulting",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AppointmentStatus::Pending),
            "arrived" => Some(AppointmentStatus::Arrived),
            "consulting" => Some(AppointmentStatus::Consulting),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        crate::services::lifecycle::valid_transitions(*self).contains(&next)
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a booking counts as confirmed. Online-paid bookings stay
/// `AwaitingPayment` until the gateway reports success.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    Confirmed,
    AwaitingPayment,
    PaymentFailed,
}

impl Confirmation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confirmation::Confirmed => "confirmed",
            Confirmation::AwaitingPayment => "awaiting_payment",
            Confirmation::PaymentFailed => "payment_failed",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct BookingSummary {
    pub total: u32,
    pub online: u32,
    pub offline: u32,
    pub priority: u32,
    pub general: u32,
    pub awaiting_payment: u32,
    pub cancelled: u32,
}

impl BookingSummary {
    /// Tallies a day's ledger. Only confirmed, non-cancelled rows reach the
    /// headline counters.
    pub fn tally(appointments: &[Appointment]) -> Self {
        let mut summary = BookingSummary::default();
        for appt in appointments {
            if appt.status == AppointmentStatus::Cancelled {
                summary.cancelled += 1;
                continue;
            }
            if appt.confirmation() != Confirmation::Confirmed {
                summary.awaiting_payment += 1;
                continue;
            }
            summary.total += 1;
            match appt.booking_type {
                BookingType::Online => summary.online += 1,
                BookingType::Offline => summary.offline += 1,
            }
            match appt.appointment_type {
                AppointmentType::General => summary.general += 1,
                AppointmentType::Priority => summary.priority += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appt(
        appointment_type: AppointmentType,
        booking_type: BookingType,
        payment_method: PaymentMethod,
        payment_status: Option<PaymentStatus>,
        status: AppointmentStatus,
    ) -> Appointment {
        let ts = NaiveDate::from_ymd_opt(2025, 6, 16)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        Appointment {
            id: uuid::Uuid::new_v4().to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 17).unwrap(),
            serial_number: None,
            appointment_type,
            booking_type,
            payment_method,
            preferred_time: None,
            arrival_time: None,
            slot_time: None,
            status,
            patient: None,
            payment_status,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_status_round_trip_strings() {
        for s in ["pending", "arrived", "consulting", "completed", "cancelled"] {
            assert_eq!(AppointmentStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(AppointmentStatus::parse("confirmed").is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(AppointmentStatus::Completed.is_terminal());
        assert!(AppointmentStatus::Cancelled.is_terminal());
        assert!(!AppointmentStatus::Consulting.is_terminal());
    }

    #[test]
    fn test_confirmation_depends_on_payment() {
        use AppointmentStatus::Pending;
        let counter = appt(AppointmentType::General, BookingType::Online, PaymentMethod::PayAtCounter, None, Pending);
        assert_eq!(counter.confirmation(), Confirmation::Confirmed);

        let unpaid = appt(AppointmentType::Priority, BookingType::Online, PaymentMethod::Online, Some(PaymentStatus::Pending), Pending);
        assert_eq!(unpaid.confirmation(), Confirmation::AwaitingPayment);

        let paid = appt(AppointmentType::Priority, BookingType::Online, PaymentMethod::Online, Some(PaymentStatus::Success), Pending);
        assert_eq!(paid.confirmation(), Confirmation::Confirmed);

        let failed = appt(AppointmentType::General, BookingType::Online, PaymentMethod::Online, Some(PaymentStatus::Failed), Pending);
        assert_eq!(failed.confirmation(), Confirmation::PaymentFailed);
    }

    #[test]
    fn test_summary_skips_unconfirmed_and_cancelled() {
        use AppointmentStatus::*;
        let rows = vec![
            appt(AppointmentType::General, BookingType::Online, PaymentMethod::PayAtCounter, None, Pending),
            appt(AppointmentType::General, BookingType::Offline, PaymentMethod::PayAtCounter, None, Arrived),
            appt(AppointmentType::Priority, BookingType::Online, PaymentMethod::Online, Some(PaymentStatus::Success), Completed),
            appt(AppointmentType::Priority, BookingType::Online, PaymentMethod::Online, Some(PaymentStatus::Pending), Pending),
            appt(AppointmentType::General, BookingType::Online, PaymentMethod::PayAtCounter, None, Cancelled),
        ];
        let summary = BookingSummary::tally(&rows);
        assert_eq!(
            summary,
            BookingSummary {
                total: 3,
                online: 2,
                offline: 1,
                priority: 1,
                general: 2,
                awaiting_payment: 1,
                cancelled: 1,
            }
        );
    }
}
