pub mod razorpay;

use async_trait::async_trait;
use base64::Engine;
use hmac::{Hmac, Mac};
use rusqlite::Connection;
use serde::Deserialize;
use sha2::Sha256;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Payment, PaymentStatus};

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens an order for `amount_minor` and returns the gateway's order id.
    async fn create_order(&self, receipt: &str, amount_minor: i64) -> anyhow::Result<String>;

    /// Checks a callback signature for `order_id`/`payment_id`.
    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;
}

/// Base64 HMAC-SHA256 of `"{order_id}|{payment_id}"` keyed with the gateway
/// secret.
pub fn sign(secret: &str, order_id: &str, payment_id: &str) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return String::new(),
    };
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

pub fn verify_hmac_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(signature) else {
        return false;
    };
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackOutcome {
    Success,
    Failed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentCallback {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
    pub outcome: CallbackOutcome,
    pub error_reason: Option<String>,
}

/// Applies a verified gateway callback. Settled payments are left alone, so
/// replays are harmless. Serial numbers are never touched here.
pub fn settle(
    conn: &Connection,
    gateway: &dyn PaymentGateway,
    callback: &PaymentCallback,
) -> Result<Payment, AppError> {
    if !gateway.verify_signature(&callback.order_id, &callback.payment_id, &callback.signature) {
        tracing::warn!(order_id = %callback.order_id, "payment callback with bad signature");
        return Err(AppError::InvalidSignature);
    }

    let payment = queries::get_payment_by_order(conn, &callback.order_id)?
        .ok_or_else(|| AppError::NotFound(format!("payment order {}", callback.order_id)))?;

    if payment.status != PaymentStatus::Pending {
        tracing::info!(order_id = %callback.order_id, status = payment.status.as_str(), "payment already settled");
        return Ok(payment);
    }

    match callback.outcome {
        CallbackOutcome::Success => {
            queries::mark_payment_success(conn, &callback.order_id, &callback.payment_id)?;
        }
        CallbackOutcome::Failed => {
            let reason = callback.error_reason.as_deref().unwrap_or("payment failed");
            queries::mark_payment_failed(conn, &callback.order_id, reason)?;
        }
    }

    let updated = queries::get_payment_by_order(conn, &callback.order_id)?
        .ok_or_else(|| AppError::NotFound(format!("payment order {}", callback.order_id)))?;
    tracing::info!(
        order_id = %updated.gateway_order_id,
        appointment_id = %updated.appointment_id,
        status = updated.status.as_str(),
        "payment settled"
    );
    Ok(updated)
}
