use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorAvailability {
    pub date: NaiveDate,
    pub available: bool,
    pub note: Option<String>,
    pub updated_at: NaiveDateTime,
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Which weekdays the clinic runs, indexed by `Weekday::num_days_from_monday`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingDays([bool; 7]);

impl Default for OperatingDays {
    fn default() -> Self {
        let mut days = [true; 7];
        days[Weekday::Sun.num_days_from_monday() as usize] = false;
        OperatingDays(days)
    }
}

impl OperatingDays {
    pub fn every_day() -> Self {
        OperatingDays([true; 7])
    }

    /// Builds the set from a comma list of closed days, e.g. `"sun"` or
    /// `"sat, sun"`. An empty list closes nothing.
    pub fn with_closed(list: &str) -> anyhow::Result<Self> {
        let mut days = [true; 7];
        for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let day = parse_weekday(part)?;
            days[day.num_days_from_monday() as usize] = false;
        }
        if days.iter().all(|open| !open) {
            return Err(anyhow::anyhow!("at least one weekday must be an operating day"));
        }
        Ok(OperatingDays(days))
    }

    pub fn is_open(&self, day: Weekday) -> bool {
        self.0[day.num_days_from_monday() as usize]
    }

    /// First operating date on or after `date`.
    pub fn next_operating_date(&self, date: NaiveDate) -> NaiveDate {
        let mut candidate = date;
        for _ in 0..7 {
            if self.is_open(candidate.weekday()) {
                return candidate;
            }
            match candidate.succ_opt() {
                Some(next) => candidate = next,
                None => break,
            }
        }
        candidate
    }

    pub fn closed_days(&self) -> Vec<Weekday> {
        WEEK.iter().copied().filter(|d| !self.is_open(*d)).collect()
    }

    pub fn to_human_readable(&self) -> String {
        self.closed_days()
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn parse_weekday(s: &str) -> anyhow::Result<Weekday> {
    match s.to_lowercase().as_str() {
        "mon" | "monday" => Ok(Weekday::Mon),
        "tue" | "tuesday" => Ok(Weekday::Tue),
        "wed" | "wednesday" => Ok(Weekday::Wed),
        "thu" | "thursday" => Ok(Weekday::Thu),
        "fri" | "friday" => Ok(Weekday::Fri),
        "sat" | "saturday" => Ok(Weekday::Sat),
        "sun" | "sunday" => Ok(Weekday::Sun),
        _ => Err(anyhow::anyhow!("invalid weekday: {s}")),
    }
}
