use super::types::{VerifyResponse, VerifySignatureRequest};
use super::PaypalClient;
use axum::http::HeaderMap;
use tracing::{error, info, warn};

/// The `paypal-*` transmission headers PayPal signs a delivery with
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransmissionHeaders {
    pub transmission_id: String,
    pub transmission_time: String,
    pub cert_url: String,
    pub auth_algo: String,
    pub transmission_sig: String,
}

impl TransmissionHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        Self {
            transmission_id: get("paypal-transmission-id"),
            transmission_time: get("paypal-transmission-time"),
            cert_url: get("paypal-cert-url"),
            auth_algo: get("paypal-auth-algo"),
            transmission_sig: get("paypal-transmission-sig"),
        }
    }

    fn is_complete(&self) -> bool {
        !self.transmission_id.is_empty()
            && !self.transmission_time.is_empty()
            && !self.cert_url.is_empty()
            && !self.auth_algo.is_empty()
            && !self.transmission_sig.is_empty()
    }
}

impl PaypalClient {
    /// Asks PayPal whether a webhook delivery is authentic.
    /// Any failure along the way counts as "not authentic".
    pub async fn verify_webhook_signature(
        &self,
        headers: &TransmissionHeaders,
        event: &serde_json::Value,
    ) -> bool {
        if self.debug_bypass {
            warn!("PAYPAL_DEBUG_WEBHOOK active - webhook signature not checked");
            return true;
        }
        if !self.credentials.is_complete() || self.credentials.webhook_id.is_empty() {
            warn!("PayPal client id, secret or webhook id missing - rejecting webhook");
            return false;
        }
        if !headers.is_complete() {
            warn!("Webhook delivery without transmission headers");
            return false;
        }

        let token = match self.access_token().await {
            Ok(token) => token,
            Err(e) => {
                error!(error = %e, "Could not obtain PayPal token for verification");
                return false;
            }
        };

        let request = VerifySignatureRequest {
            transmission_id: &headers.transmission_id,
            transmission_time: &headers.transmission_time,
            cert_url: &headers.cert_url,
            auth_algo: &headers.auth_algo,
            transmission_sig: &headers.transmission_sig,
            webhook_id: &self.credentials.webhook_id,
            webhook_event: event,
        };

        let response = match self
            .http
            .post(format!(
                "{}/v1/notifications/verify-webhook-signature",
                self.base_url
            ))
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Webhook verification request failed");
                return false;
            }
        };

        let status = response.status();
        match response.json::<VerifyResponse>().await {
            Ok(body) => {
                info!(%status, verification_status = %body.verification_status, "Webhook verification");
                body.verification_status == "SUCCESS"
            }
            Err(e) => {
                error!(%status, error = %e, "Unreadable verification response");
                false
            }
        }
    }
}
