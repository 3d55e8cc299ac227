use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::{verify_hmac_signature, PaymentGateway};

const CURRENCY: &str = "INR";

pub struct RazorpayGateway {
    base_url: String,
    key_id: String,
    key_secret: String,
    client: reqwest::Client,
}

impl RazorpayGateway {
    pub fn new(base_url: String, key_id: String, key_secret: String) -> Self {
        Self {
            base_url,
            key_id,
            key_secret,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, receipt: &str, amount_minor: i64) -> anyhow::Result<String> {
        let body = json!({
            "amount": amount_minor,
            "currency": CURRENCY,
            "receipt": receipt,
        });

        let resp = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .context("failed to call payment gateway")?
            .error_for_status()
            .context("payment gateway returned error")?;

        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse payment gateway response")?;

        data["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing order id in payment gateway response"))
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_hmac_signature(&self.key_secret, order_id, payment_id, signature)
    }
}
