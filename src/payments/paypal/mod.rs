use super::{BuyerReference, CompletedCapture, PaymentError};
use crate::catalog::{Money, Product};
use moka::sync::Cache;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

pub mod types;
pub mod webhook_validation;

use types::{Capture, Order, TokenResponse};
pub use webhook_validation::TransmissionHeaders;

// Tokens live for hours, refreshing well before that keeps us clear of expiry
const TOKEN_TTL: Duration = Duration::from_secs(30 * 60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Default)]
pub struct PaypalCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub webhook_id: String,
}

impl PaypalCredentials {
    fn is_complete(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// Everything needed to open a checkout for one product
#[derive(Debug, Clone)]
pub struct OrderRequest<'a> {
    pub product: &'a Product,
    pub buyer: BuyerReference,
    pub currency: &'a str,
    pub brand_name: &'a str,
    pub return_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedOrder {
    pub id: String,
    pub approve_url: String,
}

pub struct PaypalClient {
    http: reqwest::Client,
    base_url: String,
    credentials: PaypalCredentials,
    debug_bypass: bool,
    token_cache: Cache<&'static str, String>,
}

impl PaypalClient {
    pub fn new(base_url: &str, credentials: PaypalCredentials, debug_bypass: bool) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            debug_bypass,
            token_cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(TOKEN_TTL)
                .build(),
        }
    }

    async fn access_token(&self) -> Result<String, PaymentError> {
        if let Some(token) = self.token_cache.get("access_token") {
            return Ok(token);
        }
        if !self.credentials.is_complete() {
            return Err(PaymentError::MissingCredentials);
        }

        let response = self
            .http
            .post(format!("{}/v1/oauth2/token", self.base_url))
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let response = error_for_status(response).await?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Decode(e.to_string()))?;
        debug!(expires_in = token.expires_in, "Fetched PayPal access token");

        self.token_cache
            .insert("access_token", token.access_token.clone());
        Ok(token.access_token)
    }

    pub async fn create_order(
        &self,
        request: &OrderRequest<'_>,
    ) -> Result<CreatedOrder, PaymentError> {
        let token = self.access_token().await?;
        let price = request.product.price(request.currency);

        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": request.product.sku,
                "custom_id": request.buyer.to_string(),
                "description": request.product.name,
                "amount": {
                    "currency_code": price.currency,
                    "value": price.value(),
                },
            }],
            "application_context": {
                "brand_name": request.brand_name,
                "user_action": "PAY_NOW",
                "shipping_preference": "NO_SHIPPING",
                "return_url": request.return_url,
                "cancel_url": request.cancel_url,
            },
        });

        let response = self
            .http
            .post(format!("{}/v2/checkout/orders", self.base_url))
            .bearer_auth(token)
            .header("PayPal-Request-Id", Uuid::new_v4().to_string())
            .json(&body)
            .send()
            .await?;
        let response = error_for_status(response).await?;

        let order: Order = response
            .json()
            .await
            .map_err(|e| PaymentError::Decode(e.to_string()))?;
        let approve_url = order
            .approve_link()
            .ok_or_else(|| PaymentError::MissingApproveLink(order.id.clone()))?
            .to_string();

        info!(order_id = %order.id, buyer = %request.buyer, "Created PayPal order");
        Ok(CreatedOrder {
            id: order.id,
            approve_url,
        })
    }

    pub async fn capture_order(&self, order_id: &str) -> Result<CompletedCapture, PaymentError> {
        let token = self.access_token().await?;

        let response = self
            .http
            .post(format!(
                "{}/v2/checkout/orders/{}/capture",
                self.base_url,
                urlencoding::encode(order_id)
            ))
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await?;
        let response = error_for_status(response).await?;

        let order: Order = response
            .json()
            .await
            .map_err(|e| PaymentError::Decode(e.to_string()))?;
        info!(order_id = %order.id, status = %order.status, "Captured PayPal order");

        completed_capture_from_order(&order)
    }
}

/// Builds the fulfilment view of a capture, falling back to the purchase
/// unit when the capture itself carries no `custom_id`.
pub fn completed_capture(
    capture: &Capture,
    unit_custom_id: Option<&str>,
    order_id: Option<&str>,
) -> Result<CompletedCapture, PaymentError> {
    let custom_id = capture
        .custom_id
        .as_deref()
        .or(unit_custom_id)
        .ok_or_else(|| PaymentError::InvalidReference(format!("capture {} has no custom_id", capture.id)))?;

    Ok(CompletedCapture {
        capture_id: capture.id.clone(),
        order_id: order_id.or(capture.order_id()).map(str::to_string),
        status: capture.status.clone(),
        buyer: custom_id.parse()?,
        amount: Money::parse(&capture.amount.value, &capture.amount.currency_code)?,
    })
}

fn completed_capture_from_order(order: &Order) -> Result<CompletedCapture, PaymentError> {
    order
        .purchase_units
        .iter()
        .find_map(|unit| {
            let capture = unit.payments.as_ref()?.captures.first()?;
            Some(completed_capture(
                capture,
                unit.custom_id.as_deref(),
                Some(&order.id),
            ))
        })
        .unwrap_or_else(|| Err(PaymentError::NoCapture(order.id.clone())))
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, PaymentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(PaymentError::Api {
        status: status.as_u16(),
        body: response.text().await.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::find_product;
    use mockito::Matcher;

    fn credentials() -> PaypalCredentials {
        PaypalCredentials {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            webhook_id: "WH-1".to_string(),
        }
    }

    fn order_request(product: &Product) -> OrderRequest<'_> {
        OrderRequest {
            product,
            buyer: BuyerReference {
                user_id: 123,
                sku: product.sku.to_string(),
            },
            currency: "EUR",
            brand_name: "ChiaraBadGirl",
            return_url: "https://shop.example.com/paypal/return".to_string(),
            cancel_url: "https://shop.example.com/cancel".to_string(),
        }
    }

    const CAPTURED_ORDER: &str = r#"{
        "id": "ORDER-1",
        "status": "COMPLETED",
        "purchase_units": [{
            "reference_id": "VIP_PASS",
            "payments": {
                "captures": [{
                    "id": "CAP-1",
                    "status": "COMPLETED",
                    "amount": { "currency_code": "EUR", "value": "40.00" },
                    "custom_id": "123:VIP_PASS"
                }]
            }
        }]
    }"#;

    #[tokio::test]
    async fn test_create_order_returns_approve_link_and_caches_token() {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/v1/oauth2/token")
            .match_body(Matcher::UrlEncoded(
                "grant_type".into(),
                "client_credentials".into(),
            ))
            .with_status(200)
            .with_body(r#"{"access_token":"A21","expires_in":32400}"#)
            .expect(1)
            .create_async()
            .await;
        let orders = server
            .mock("POST", "/v2/checkout/orders")
            .match_header("authorization", "Bearer A21")
            .match_header("paypal-request-id", Matcher::Any)
            .match_body(Matcher::PartialJsonString(
                r#"{"intent":"CAPTURE","purchase_units":[{"custom_id":"123:VIP_PASS","amount":{"currency_code":"EUR","value":"40.00"}}]}"#
                    .to_string(),
            ))
            .with_status(201)
            .with_body(
                r#"{"id":"ORDER-1","status":"CREATED","links":[
                    {"href":"https://api.paypal.com/v2/checkout/orders/ORDER-1","rel":"self"},
                    {"href":"https://www.paypal.com/checkoutnow?token=ORDER-1","rel":"approve"}]}"#,
            )
            .expect(2)
            .create_async()
            .await;

        let client = PaypalClient::new(&server.url(), credentials(), false);
        let product = find_product("VIP_PASS").unwrap();

        for _ in 0..2 {
            let created = client.create_order(&order_request(product)).await.unwrap();
            assert_eq!(created.id, "ORDER-1");
            assert_eq!(
                created.approve_url,
                "https://www.paypal.com/checkoutnow?token=ORDER-1"
            );
        }
        token.assert_async().await;
        orders.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let client = PaypalClient::new("http://127.0.0.1:9", PaypalCredentials::default(), false);
        let product = find_product("VIP_PASS").unwrap();
        assert!(matches!(
            client.create_order(&order_request(product)).await,
            Err(PaymentError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn test_capture_order_extracts_capture() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/oauth2/token")
            .with_status(200)
            .with_body(r#"{"access_token":"A21","expires_in":32400}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/v2/checkout/orders/ORDER-1/capture")
            .with_status(201)
            .with_body(CAPTURED_ORDER)
            .create_async()
            .await;

        let client = PaypalClient::new(&server.url(), credentials(), false);
        let capture = client.capture_order("ORDER-1").await.unwrap();

        assert_eq!(capture.capture_id, "CAP-1");
        assert_eq!(capture.order_id.as_deref(), Some("ORDER-1"));
        assert_eq!(capture.buyer.user_id, 123);
        assert_eq!(capture.amount, Money::new(4000, "EUR"));
        assert!(capture.is_completed());
    }

    #[tokio::test]
    async fn test_already_captured_order_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/oauth2/token")
            .with_status(200)
            .with_body(r#"{"access_token":"A21","expires_in":32400}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/v2/checkout/orders/ORDER-1/capture")
            .with_status(422)
            .with_body(r#"{"name":"UNPROCESSABLE_ENTITY","details":[{"issue":"ORDER_ALREADY_CAPTURED"}]}"#)
            .create_async()
            .await;

        let client = PaypalClient::new(&server.url(), credentials(), false);
        assert!(matches!(
            client.capture_order("ORDER-1").await,
            Err(PaymentError::Api { status: 422, .. })
        ));
    }

    #[test]
    fn test_order_without_capture() {
        let order: Order =
            serde_json::from_str(r#"{"id":"ORDER-2","status":"APPROVED","purchase_units":[{}]}"#)
                .unwrap();
        assert!(matches!(
            completed_capture_from_order(&order),
            Err(PaymentError::NoCapture(id)) if id == "ORDER-2"
        ));
    }
}
