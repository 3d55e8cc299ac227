use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

use crate::models::OperatingDays;

/// 17:00, when bookings for the next clinic day open.
pub const WINDOW_OPENS_MINUTE: u32 = 17 * 60;
/// 08:15, when bookings for the current clinic day close.
pub const WINDOW_CLOSES_MINUTE: u32 = 8 * 60 + 15;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WindowStatus {
    pub is_open: bool,
    pub target_date: Option<NaiveDate>,
    /// Closed because today's evening window has not started yet. Only for
    /// messaging; a closed window is closed either way.
    pub is_before_window_open_today: bool,
    pub opens_at: Option<NaiveDateTime>,
    /// End of the currently open window.
    pub closes_at: Option<NaiveDateTime>,
}

/// The nightly booking gate: day D accepts bookings from 17:00 on D-1 until
/// 08:15 on D.
#[derive(Debug, Clone, Copy)]
pub struct BookingWindow {
    operating_days: OperatingDays,
}

impl BookingWindow {
    pub fn new(operating_days: OperatingDays) -> Self {
        Self { operating_days }
    }

    /// `now` is clinic-local wall-clock time.
    pub fn evaluate(&self, now: NaiveDateTime) -> WindowStatus {
        let minutes = now.hour() * 60 + now.minute();
        let today = now.date();

        if minutes >= WINDOW_OPENS_MINUTE {
            let tomorrow = today.succ_opt().unwrap_or(today);
            return self.open_for(tomorrow);
        }
        if minutes < WINDOW_CLOSES_MINUTE {
            return self.open_for(today);
        }

        WindowStatus {
            is_open: false,
            target_date: None,
            is_before_window_open_today: true,
            opens_at: at_minute(today, WINDOW_OPENS_MINUTE),
            closes_at: None,
        }
    }

    fn open_for(&self, date: NaiveDate) -> WindowStatus {
        let target = self.operating_days.next_operating_date(date);
        WindowStatus {
            is_open: true,
            target_date: Some(target),
            is_before_window_open_today: false,
            opens_at: None,
            closes_at: at_minute(date, WINDOW_CLOSES_MINUTE),
        }
    }
}

fn at_minute(date: NaiveDate, minute_of_day: u32) -> Option<NaiveDateTime> {
    NaiveTime::from_num_seconds_from_midnight_opt(minute_of_day * 60, 0).map(|t| date.and_time(t))
}
