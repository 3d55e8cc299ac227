use std::env;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

use crate::models::OperatingDays;
use crate::services::slots::OverflowPolicy;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub clinic_offset: FixedOffset,
    pub operating_days: OperatingDays,
    pub doctor_available_by_default: bool,
    pub overflow_policy: OverflowPolicy,
    pub assign_lock_timeout: Duration,
    pub assign_max_retries: u32,
    pub general_fee_minor: i64,
    pub priority_fee_minor: i64,
    pub payment_gateway_url: String,
    pub payment_key_id: String,
    pub payment_key_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let clinic_offset = env::var("CLINIC_UTC_OFFSET")
            .ok()
            .and_then(|v| match parse_utc_offset(&v) {
                Some(offset) => Some(offset),
                None => {
                    tracing::warn!(value = %v, "invalid CLINIC_UTC_OFFSET, using +05:30");
                    None
                }
            })
            .unwrap_or_else(default_offset);

        let operating_days = match env::var("CLOSED_WEEKDAYS") {
            Ok(v) => OperatingDays::with_closed(&v).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "invalid CLOSED_WEEKDAYS, closing sundays only");
                OperatingDays::default()
            }),
            Err(_) => OperatingDays::default(),
        };

        let overflow_policy = match env::var("SLOT_OVERFLOW_POLICY") {
            Ok(v) => OverflowPolicy::parse(&v).unwrap_or_else(|| {
                tracing::warn!(value = %v, "unknown SLOT_OVERFLOW_POLICY, using clamp");
                OverflowPolicy::Clamp
            }),
            Err(_) => OverflowPolicy::Clamp,
        };

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "clinicdesk.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            clinic_offset,
            operating_days,
            doctor_available_by_default: env::var("DOCTOR_AVAILABLE_BY_DEFAULT")
                .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "no"))
                .unwrap_or(true),
            overflow_policy,
            assign_lock_timeout: Duration::from_millis(
                env::var("ASSIGN_LOCK_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(2000),
            ),
            assign_max_retries: env::var("ASSIGN_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            general_fee_minor: env::var("GENERAL_FEE_MINOR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20_000),
            priority_fee_minor: env::var("PRIORITY_FEE_MINOR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50_000),
            payment_gateway_url: env::var("PAYMENT_GATEWAY_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string()),
            payment_key_id: env::var("PAYMENT_KEY_ID").unwrap_or_default(),
            payment_key_secret: env::var("PAYMENT_KEY_SECRET").unwrap_or_default(),
        }
    }
}

const DEFAULT_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

fn default_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Parses `+HH:MM` / `-HH:MM` (or `Z`).
pub fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match s.chars().next()? {
        '+' => (1, &s[1..]),
        '-' => (-1, &s[1..]),
        _ => return None,
    };
    let (h, m) = rest.split_once(':')?;
    let hours: i32 = h.parse().ok()?;
    let minutes: i32 = m.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
