use axum::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::GatewayConfig;

/// Payment provider seam. The live implementation talks to Razorpay's REST
/// API; tests swap in a fake.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> anyhow::Result<serde_json::Value>;

    async fn fetch_payment(&self, payment_id: &str) -> anyhow::Result<serde_json::Value>;
}

pub struct RazorpayGateway {
    http: reqwest::Client,
    key_id: String,
    key_secret: String,
    base_url: String,
}

impl RazorpayGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> anyhow::Result<serde_json::Value> {
        let response = self
            .http
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&serde_json::json!({
                "amount": amount,
                "currency": currency,
                "receipt": receipt,
            }))
            .send()
            .await?;
        let status = response.status();
        let body: serde_json::Value = response.json().await?;
        if !status.is_success() {
            anyhow::bail!("order creation failed ({status}): {body}");
        }
        Ok(body)
    }

    async fn fetch_payment(&self, payment_id: &str) -> anyhow::Result<serde_json::Value> {
        let response = self
            .http
            .get(format!("{}/v1/payments/{}", self.base_url, payment_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await?;
        let status = response.status();
        let body: serde_json::Value = response.json().await?;
        if !status.is_success() {
            anyhow::bail!("payment lookup failed ({status}): {body}");
        }
        Ok(body)
    }
}

/// Checkout signature check: HMAC-SHA256 over `"{order_id}|{payment_id}"`
/// keyed with the API secret, compared against the hex digest the client
/// relays back.
pub fn verify_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());
    // Signatures are attacker-supplied; compare without early exit.
    let signature = signature.as_bytes();
    let expected = expected.as_bytes();
    if signature.len() != expected.len() {
        return false;
    }
    signature
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_correct_signature() {
        let mut mac = Hmac::<Sha256>::new_from_slice(b"secret123").unwrap();
        mac.update(b"order_abc|pay_xyz");
        let sig = hex::encode(mac.finalize().into_bytes());
        assert!(verify_signature("secret123", "order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn rejects_a_tampered_signature() {
        let mut mac = Hmac::<Sha256>::new_from_slice(b"secret123").unwrap();
        mac.update(b"order_abc|pay_xyz");
        let mut sig = hex::encode(mac.finalize().into_bytes());
        sig.replace_range(0..1, if sig.starts_with('0') { "1" } else { "0" });
        assert!(!verify_signature("secret123", "order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn rejects_wrong_length_and_wrong_key() {
        assert!(!verify_signature("secret123", "order_abc", "pay_xyz", "deadbeef"));
        let mut mac = Hmac::<Sha256>::new_from_slice(b"other-secret").unwrap();
        mac.update(b"order_abc|pay_xyz");
        let sig = hex::encode(mac.finalize().into_bytes());
        assert!(!verify_signature("secret123", "order_abc", "pay_xyz", &sig));
    }
}
