use super::fulfilment::{FulfilmentOutcome, FulfilmentService};
use super::paypal::types::{Capture, Order, WebhookEvent};
use super::paypal::{completed_capture, PaypalClient, TransmissionHeaders};
use super::PaymentError;
use std::sync::Arc;
use tracing::info;

pub const CAPTURE_COMPLETED: &str = "PAYMENT.CAPTURE.COMPLETED";
pub const ORDER_APPROVED: &str = "CHECKOUT.ORDER.APPROVED";

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    InvalidSignature,
    Fulfilled(FulfilmentOutcome),
    Ignored(String),
}

impl WebhookOutcome {
    /// Plain text body returned to PayPal, always with status 200
    pub fn response_text(&self) -> &'static str {
        match self {
            WebhookOutcome::InvalidSignature => "IGNORED_INVALID_SIGNATURE",
            WebhookOutcome::Fulfilled(FulfilmentOutcome::Duplicate) => "DUPLICATE",
            WebhookOutcome::Fulfilled(_) | WebhookOutcome::Ignored(_) => "OK",
        }
    }
}

pub struct WebhookProcessor {
    paypal: Arc<PaypalClient>,
    fulfilment: Arc<FulfilmentService>,
}

impl WebhookProcessor {
    pub fn new(paypal: Arc<PaypalClient>, fulfilment: Arc<FulfilmentService>) -> Self {
        Self { paypal, fulfilment }
    }

    /// Verify first, then dispatch on the event type. Nothing touches the
    /// store before the signature check passed.
    pub async fn process(
        &self,
        headers: &TransmissionHeaders,
        raw_body: &[u8],
    ) -> Result<WebhookOutcome, PaymentError> {
        let payload: serde_json::Value =
            serde_json::from_slice(raw_body).map_err(|e| PaymentError::Decode(e.to_string()))?;

        if !self.paypal.verify_webhook_signature(headers, &payload).await {
            return Ok(WebhookOutcome::InvalidSignature);
        }

        let event: WebhookEvent =
            serde_json::from_value(payload).map_err(|e| PaymentError::Decode(e.to_string()))?;
        info!(event_id = %event.id, event_type = %event.event_type, "PayPal webhook event");

        match event.event_type.as_str() {
            CAPTURE_COMPLETED => {
                let capture: Capture = serde_json::from_value(event.resource)
                    .map_err(|e| PaymentError::Decode(e.to_string()))?;
                let completed = completed_capture(&capture, None, None)?;
                Ok(WebhookOutcome::Fulfilled(
                    self.fulfilment.fulfil(&completed).await?,
                ))
            }
            ORDER_APPROVED => {
                let order: Order = serde_json::from_value(event.resource)
                    .map_err(|e| PaymentError::Decode(e.to_string()))?;
                let completed = self.paypal.capture_order(&order.id).await?;
                Ok(WebhookOutcome::Fulfilled(
                    self.fulfilment.fulfil(&completed).await?,
                ))
            }
            other => Ok(WebhookOutcome::Ignored(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::notifier::RecordingNotifier;
    use crate::database::{MemoryStore, UserStore};
    use crate::payments::paypal::PaypalCredentials;

    const CAPTURE_EVENT: &str = r#"{
        "id": "WH-EVT-1",
        "event_type": "PAYMENT.CAPTURE.COMPLETED",
        "resource": {
            "id": "CAP-1",
            "status": "COMPLETED",
            "amount": { "currency_code": "EUR", "value": "40.00" },
            "custom_id": "123:VIP_PASS",
            "supplementary_data": { "related_ids": { "order_id": "ORDER-1" } }
        }
    }"#;

    fn processor(
        base_url: &str,
        debug_bypass: bool,
    ) -> (Arc<MemoryStore>, Arc<RecordingNotifier>, WebhookProcessor) {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let credentials = PaypalCredentials {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            webhook_id: "WH-1".to_string(),
        };
        let paypal = Arc::new(PaypalClient::new(base_url, credentials, debug_bypass));
        let fulfilment = Arc::new(FulfilmentService::new(
            store.clone(),
            notifier.clone(),
            "EUR",
        ));
        (store, notifier, WebhookProcessor::new(paypal, fulfilment))
    }

    fn signed_headers() -> TransmissionHeaders {
        TransmissionHeaders {
            transmission_id: "tid".to_string(),
            transmission_time: "2026-10-18T10:00:00Z".to_string(),
            cert_url: "https://api.paypal.com/cert.pem".to_string(),
            auth_algo: "SHA256withRSA".to_string(),
            transmission_sig: "forged".to_string(),
        }
    }

    #[tokio::test]
    async fn test_forged_signature_never_mutates_store() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/oauth2/token")
            .with_status(200)
            .with_body(r#"{"access_token":"A21","expires_in":32400}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/v1/notifications/verify-webhook-signature")
            .with_status(200)
            .with_body(r#"{"verification_status":"FAILURE"}"#)
            .create_async()
            .await;

        let (store, notifier, processor) = processor(&server.url(), false);
        let outcome = processor
            .process(&signed_headers(), CAPTURE_EVENT.as_bytes())
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::InvalidSignature);
        assert_eq!(outcome.response_text(), "IGNORED_INVALID_SIGNATURE");
        assert!(store.get_user(123).await.unwrap().is_none());
        assert!(notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_capture_event_is_fulfilled_once() {
        let (store, notifier, processor) = processor("http://127.0.0.1:9", true);

        let first = processor
            .process(&TransmissionHeaders::default(), CAPTURE_EVENT.as_bytes())
            .await
            .unwrap();
        let replay = processor
            .process(&TransmissionHeaders::default(), CAPTURE_EVENT.as_bytes())
            .await
            .unwrap();

        assert!(matches!(
            first,
            WebhookOutcome::Fulfilled(FulfilmentOutcome::Activated(_))
        ));
        assert_eq!(replay.response_text(), "DUPLICATE");
        assert_eq!(store.get_user(123).await.unwrap().unwrap().punkte, 6);
        assert_eq!(notifier.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_order_approved_captures_then_fulfils() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/oauth2/token")
            .with_status(200)
            .with_body(r#"{"access_token":"A21","expires_in":32400}"#)
            .create_async()
            .await;
        let capture = server
            .mock("POST", "/v2/checkout/orders/ORDER-9/capture")
            .with_status(201)
            .with_body(
                r#"{"id":"ORDER-9","status":"COMPLETED","purchase_units":[{
                    "custom_id":"555:FULL_ACCESS",
                    "payments":{"captures":[{"id":"CAP-9","status":"COMPLETED",
                    "amount":{"currency_code":"EUR","value":"50.00"}}]}}]}"#,
            )
            .create_async()
            .await;

        let (store, _notifier, processor) = processor(&server.url(), true);
        let body = r#"{"id":"WH-EVT-2","event_type":"CHECKOUT.ORDER.APPROVED",
            "resource":{"id":"ORDER-9","status":"APPROVED"}}"#;
        let outcome = processor
            .process(&TransmissionHeaders::default(), body.as_bytes())
            .await
            .unwrap();

        assert_eq!(outcome.response_text(), "OK");
        capture.assert_async().await;
        let user = store.get_user(555).await.unwrap().unwrap();
        assert_eq!(user.status.as_deref(), Some("FULL"));
        assert_eq!(user.punkte, 7);
    }

    #[tokio::test]
    async fn test_other_events_are_acknowledged() {
        let (_store, _notifier, processor) = processor("http://127.0.0.1:9", true);
        let body = r#"{"id":"WH-EVT-3","event_type":"PAYMENT.CAPTURE.REFUNDED","resource":{}}"#;

        assert_eq!(
            processor
                .process(&TransmissionHeaders::default(), body.as_bytes())
                .await
                .unwrap(),
            WebhookOutcome::Ignored("PAYMENT.CAPTURE.REFUNDED".to_string())
        );
    }

    #[tokio::test]
    async fn test_garbage_body_is_an_error() {
        let (_store, _notifier, processor) = processor("http://127.0.0.1:9", true);
        assert!(matches!(
            processor
                .process(&TransmissionHeaders::default(), b"not json")
                .await,
            Err(PaymentError::Decode(_))
        ));
    }
}
