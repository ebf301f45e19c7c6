use super::{CompletedCapture, PaymentError};
use crate::catalog::{entitlement, find_product, Money};
use crate::communication::notifier::Notifier;
use crate::database::{PurchaseGrant, PurchaseOutcome, UserStore};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum FulfilmentOutcome {
    Activated(PurchaseGrant),
    // Capture id seen before, nothing credited
    Duplicate,
    UnknownSku(String),
    AmountMismatch { expected: Money, paid: Money },
    NotCompleted(String),
}

impl FulfilmentOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            FulfilmentOutcome::Activated(_) => "ACTIVATED",
            FulfilmentOutcome::Duplicate => "DUPLICATE",
            FulfilmentOutcome::UnknownSku(_) => "UNKNOWN_SKU",
            FulfilmentOutcome::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            FulfilmentOutcome::NotCompleted(_) => "NOT_COMPLETED",
        }
    }
}

/// Turns a completed capture into an entitlement for the buyer
pub struct FulfilmentService {
    store: Arc<dyn UserStore>,
    notifier: Arc<dyn Notifier>,
    currency: String,
}

impl FulfilmentService {
    pub fn new(store: Arc<dyn UserStore>, notifier: Arc<dyn Notifier>, currency: &str) -> Self {
        Self {
            store,
            notifier,
            currency: currency.to_uppercase(),
        }
    }

    pub async fn fulfil(
        &self,
        capture: &CompletedCapture,
    ) -> Result<FulfilmentOutcome, PaymentError> {
        self.fulfil_on(capture, entitlement::today()).await
    }

    pub async fn fulfil_on(
        &self,
        capture: &CompletedCapture,
        today: NaiveDate,
    ) -> Result<FulfilmentOutcome, PaymentError> {
        let user_id = capture.buyer.user_id;

        if !capture.is_completed() {
            warn!(capture_id = %capture.capture_id, status = %capture.status, "Capture not completed");
            return Ok(FulfilmentOutcome::NotCompleted(capture.status.clone()));
        }

        let Some(product) = find_product(&capture.buyer.sku) else {
            error!(capture_id = %capture.capture_id, sku = %capture.buyer.sku, "Unknown SKU in capture");
            return Ok(FulfilmentOutcome::UnknownSku(capture.buyer.sku.clone()));
        };

        let expected = product.price(&self.currency);
        if capture.amount.currency != expected.currency || capture.amount.cents < expected.cents {
            error!(
                capture_id = %capture.capture_id,
                %user_id,
                expected = %expected,
                paid = %capture.amount,
                "Paid amount does not cover product"
            );
            return Ok(FulfilmentOutcome::AmountMismatch {
                expected,
                paid: capture.amount.clone(),
            });
        }

        let grant =
            entitlement::grant_for(product, &capture.capture_id, user_id, &capture.amount, today);

        match self.store.apply_purchase(&grant).await? {
            PurchaseOutcome::Duplicate => {
                info!(capture_id = %capture.capture_id, %user_id, "Capture already fulfilled");
                return Ok(FulfilmentOutcome::Duplicate);
            }
            PurchaseOutcome::Applied => {
                info!(
                    capture_id = %capture.capture_id,
                    %user_id,
                    sku = %grant.sku,
                    points = grant.points,
                    status_end = ?grant.status_end,
                    "Purchase activated"
                );
            }
        }

        if let Err(e) = self
            .notifier
            .notify(user_id, &activation_message(&grant))
            .await
        {
            error!(%user_id, error = %e, "Failed to send activation message");
        }

        Ok(FulfilmentOutcome::Activated(grant))
    }
}

pub fn activation_message(grant: &PurchaseGrant) -> String {
    let mut text = format!(
        "✅ <b>Zahlung erhalten!</b>\n\n🛒 <b>Produkt:</b> {}\n",
        grant.product_name
    );
    if let Some(status) = &grant.status {
        text.push_str(&format!("📌 <b>Status:</b> {}\n", status));
        match grant.status_end {
            Some(end) => text.push_str(&format!(
                "⏳ <b>Gültig bis:</b> {}\n",
                end.format("%d.%m.%Y")
            )),
            None => text.push_str("⏳ <b>Gültig bis:</b> unbegrenzt\n"),
        }
    }
    text.push_str(&format!("⭐ <b>+{} Punkte</b>\n\n💋 Danke für deinen Kauf!", grant.points));
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::notifier::RecordingNotifier;
    use crate::database::MemoryStore;
    use crate::payments::BuyerReference;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn capture(capture_id: &str, sku: &str, value: &str) -> CompletedCapture {
        CompletedCapture {
            capture_id: capture_id.to_string(),
            order_id: Some("ORDER-1".to_string()),
            status: "COMPLETED".to_string(),
            buyer: BuyerReference {
                user_id: 123,
                sku: sku.to_string(),
            },
            amount: Money::parse(value, "EUR").unwrap(),
        }
    }

    fn service(notifier: Arc<RecordingNotifier>) -> (Arc<MemoryStore>, FulfilmentService) {
        let store = Arc::new(MemoryStore::new());
        let service = FulfilmentService::new(store.clone(), notifier, "EUR");
        (store, service)
    }

    #[tokio::test]
    async fn test_vip_pass_purchase_end_to_end() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (store, service) = service(notifier.clone());

        let outcome = service
            .fulfil_on(&capture("CAP-1", "VIP_PASS", "40.00"), today())
            .await
            .unwrap();
        assert_eq!(outcome.label(), "ACTIVATED");

        let user = store.get_user(123).await.unwrap().unwrap();
        assert_eq!(user.status.as_deref(), Some("VIP"));
        assert_eq!(user.status_start, Some(today()));
        assert_eq!(user.status_end, NaiveDate::from_ymd_opt(2026, 11, 17));
        assert_eq!(user.punkte, 6);
        assert_eq!(user.purchases, vec!["VIP Pass".to_string()]);

        let sent = notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 123);
        assert!(sent[0].1.contains("17.11.2026"));
        assert!(sent[0].1.contains("+6 Punkte"));
    }

    #[tokio::test]
    async fn test_replayed_capture_is_not_credited_twice() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (store, service) = service(notifier.clone());
        let cap = capture("CAP-1", "LIFETIME", "150.00");

        service.fulfil_on(&cap, today()).await.unwrap();
        let replay = service.fulfil_on(&cap, today()).await.unwrap();

        assert_eq!(replay, FulfilmentOutcome::Duplicate);
        let user = store.get_user(123).await.unwrap().unwrap();
        assert_eq!(user.punkte, 22);
        assert_eq!(user.purchases.len(), 1);
        assert_eq!(user.status_end, NaiveDate::from_ymd_opt(2076, 10, 18));
        assert_eq!(notifier.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_sku_and_underpayment_change_nothing() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (store, service) = service(notifier.clone());

        let unknown = service
            .fulfil_on(&capture("CAP-1", "GOLD_BAR", "40.00"), today())
            .await
            .unwrap();
        assert_eq!(unknown, FulfilmentOutcome::UnknownSku("GOLD_BAR".to_string()));

        let cheap = service
            .fulfil_on(&capture("CAP-2", "VIP_PASS", "4.00"), today())
            .await
            .unwrap();
        assert!(matches!(cheap, FulfilmentOutcome::AmountMismatch { .. }));

        let mut wrong_currency = capture("CAP-3", "VIP_PASS", "40.00");
        wrong_currency.amount.currency = "USD".to_string();
        assert!(matches!(
            service.fulfil_on(&wrong_currency, today()).await.unwrap(),
            FulfilmentOutcome::AmountMismatch { .. }
        ));

        assert!(store.get_user(123).await.unwrap().is_none());
        assert!(notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_pending_capture_is_not_fulfilled() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (store, service) = service(notifier);
        let mut pending = capture("CAP-1", "VIP_PASS", "40.00");
        pending.status = "PENDING".to_string();

        assert_eq!(
            service.fulfil_on(&pending, today()).await.unwrap(),
            FulfilmentOutcome::NotCompleted("PENDING".to_string())
        );
        assert!(store.get_user(123).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_undo_activation() {
        let notifier = Arc::new(RecordingNotifier::failing());
        let (store, service) = service(notifier);

        let outcome = service
            .fulfil_on(&capture("CAP-1", "BILDER_SET", "20.00"), today())
            .await
            .unwrap();

        assert!(matches!(outcome, FulfilmentOutcome::Activated(_)));
        let user = store.get_user(123).await.unwrap().unwrap();
        assert_eq!(user.punkte, 3);
        assert_eq!(user.status, None);
    }
}
