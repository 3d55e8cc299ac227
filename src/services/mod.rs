pub mod admission;
pub mod booking_window;
pub mod clock;
pub mod lifecycle;
pub mod payments;
pub mod queue;
pub mod slots;
