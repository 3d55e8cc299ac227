pub mod appointment;
pub mod availability;
pub mod payment;
pub mod queue;

pub use appointment::{
    Appointment, AppointmentStatus, AppointmentType, BookingSummary, BookingType, Confirmation,
    NewAppointment, NewPayment, PatientDetails, PaymentMethod,
};
pub use availability::{DoctorAvailability, OperatingDays};
pub use payment::{Payment, PaymentStatus};
pub use queue::QueueEvent;
