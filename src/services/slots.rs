use chrono::{NaiveTime, Timelike};

/// What to do with a GENERAL booking whose slot would start after the last
/// slot of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Put the patient on the closing slot.
    Clamp,
    /// Refuse the booking.
    Reject,
}

impl OverflowPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "clamp" => Some(OverflowPolicy::Clamp),
            "reject" => Some(OverflowPolicy::Reject),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAssignment {
    pub serial_number: u32,
    pub arrival_time: NaiveTime,
    pub slot_time: NaiveTime,
    /// The natural slot started after `last_slot` and was clamped onto it.
    pub overflowed: bool,
}

/// Fixed-width, fixed-capacity slots for GENERAL appointments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPlan {
    pub first_slot: NaiveTime,
    pub last_slot: NaiveTime,
    pub slot_minutes: u32,
    pub per_slot: u32,
}

impl Default for SlotPlan {
    fn default() -> Self {
        Self {
            first_slot: NaiveTime::from_hms_opt(11, 0, 0).unwrap_or_default(),
            last_slot: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            slot_minutes: 30,
            per_slot: 30,
        }
    }
}

impl SlotPlan {
    /// Serial and slot for the next GENERAL booking when `existing` are
    /// already on the ledger for the date.
    pub fn compute(&self, existing: u32) -> SlotAssignment {
        let serial_number = existing.saturating_add(1);
        let slot_index = (serial_number - 1) / self.per_slot.max(1);

        let offset_minutes = i64::from(slot_index) * i64::from(self.slot_minutes);
        let first = i64::from(self.first_slot.num_seconds_from_midnight() / 60);
        let last = i64::from(self.last_slot.num_seconds_from_midnight() / 60);

        let (start_minutes, overflowed) = if first + offset_minutes > last {
            (last, true)
        } else {
            (first + offset_minutes, false)
        };
        let slot_time = NaiveTime::from_num_seconds_from_midnight_opt(start_minutes as u32 * 60, 0)
            .unwrap_or(self.last_slot);

        SlotAssignment {
            serial_number,
            arrival_time: slot_time,
            slot_time,
            overflowed,
        }
    }

    /// Number of serials that fit before clamping starts.
    pub fn capacity(&self) -> u32 {
        let span = self
            .last_slot
            .signed_duration_since(self.first_slot)
            .num_minutes()
            .max(0) as u32;
        (span / self.slot_minutes.max(1) + 1) * self.per_slot
    }
}
