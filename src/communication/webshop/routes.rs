use super::pages;
use super::AppState;
use crate::catalog::{find_product, Product};
use crate::communication::error_handler::map_payment_error_to_user_message;
use crate::payments::paypal::{CreatedOrder, OrderRequest, TransmissionHeaders};
use crate::payments::{BuyerReference, FulfilmentOutcome, PaymentError};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

const HANDLER_ERROR: &str = "IGNORED_HANDLER_ERROR";

#[derive(Debug)]
pub enum ApiError {
    Forbidden,
    NotFound(String),
    Payment(PaymentError),
}

impl From<PaymentError> for ApiError {
    fn from(e: PaymentError) -> Self {
        ApiError::Payment(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "invalid signature".to_string()),
            ApiError::NotFound(sku) => (StatusCode::NOT_FOUND, format!("unknown product {}", sku)),
            ApiError::Payment(e) => {
                error!(error = %e, "Checkout request failed");
                let status = match e {
                    PaymentError::MissingCredentials => StatusCode::SERVICE_UNAVAILABLE,
                    PaymentError::Api { status: 422, .. } => StatusCode::CONFLICT,
                    PaymentError::Http(_) | PaymentError::Api { .. } => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct PayQuery {
    uid: i64,
    sig: String,
}

#[derive(Debug, Deserialize)]
pub struct ReturnQuery {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    sku: String,
    user_id: i64,
    sig: String,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    id: String,
    approve_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    order_id: String,
}

#[derive(Debug, Serialize)]
pub struct CaptureResponse {
    capture_id: String,
    outcome: &'static str,
}

pub async fn index() -> &'static str {
    "ChiaraBot läuft"
}

pub async fn webhook_health() -> &'static str {
    "✅ PayPal Webhook Endpoint OK (GET)"
}

pub async fn webhook_alias_health() -> &'static str {
    "✅ PayPal Webhook Alias OK (GET)"
}

// PayPal retries anything but a 2xx, so every outcome answers 200
pub async fn paypal_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let transmission = TransmissionHeaders::from_headers(&headers);

    match state.webhook.process(&transmission, &body).await {
        Ok(outcome) => {
            info!(?outcome, "PayPal webhook handled");
            (StatusCode::OK, outcome.response_text())
        }
        Err(e) => {
            error!(error = %e, "PayPal webhook handler failed");
            (StatusCode::OK, HANDLER_ERROR)
        }
    }
}

pub async fn pay(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Query(query): Query<PayQuery>,
) -> Response {
    match checkout(&state, &sku, query.uid, &query.sig).await {
        Ok(order) => Redirect::to(&order.approve_url).into_response(),
        Err(ApiError::Forbidden) => {
            warn!(user_id = query.uid, %sku, "Pay link with bad signature");
            (
                StatusCode::FORBIDDEN,
                pages::error("Dieser Bezahl-Link ist ungültig. Bitte öffne den Shop erneut im Bot."),
            )
                .into_response()
        }
        Err(ApiError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            pages::error("Dieses Produkt gibt es nicht."),
        )
            .into_response(),
        Err(ApiError::Payment(e)) => {
            error!(user_id = query.uid, %sku, error = %e, "Could not open PayPal checkout");
            (
                StatusCode::BAD_GATEWAY,
                pages::error(&map_payment_error_to_user_message(&e)),
            )
                .into_response()
        }
    }
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, ApiError> {
    let order = checkout(&state, &request.sku, request.user_id, &request.sig).await?;
    Ok(Json(CreateOrderResponse {
        id: order.id,
        approve_url: order.approve_url,
    }))
}

pub async fn paypal_return(
    State(state): State<AppState>,
    Query(query): Query<ReturnQuery>,
) -> Response {
    let Some(order_id) = query.token.filter(|t| !t.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            pages::error("Es fehlt die Bestellnummer von PayPal."),
        )
            .into_response();
    };

    match capture_and_fulfil(&state, &order_id).await {
        Ok((_, outcome)) => pages::return_result(&outcome).into_response(),
        Err(e) => {
            error!(%order_id, error = %e, "Capture on return failed");
            (
                StatusCode::BAD_GATEWAY,
                pages::error(&map_payment_error_to_user_message(&e)),
            )
                .into_response()
        }
    }
}

pub async fn capture_order(
    State(state): State<AppState>,
    Json(request): Json<CaptureRequest>,
) -> Result<Json<CaptureResponse>, ApiError> {
    let (capture_id, outcome) = capture_and_fulfil(&state, &request.order_id).await?;
    Ok(Json(CaptureResponse {
        capture_id,
        outcome: outcome.label(),
    }))
}

pub async fn success() -> Html<String> {
    pages::success()
}

pub async fn cancel() -> Html<String> {
    pages::cancel()
}

async fn checkout(
    state: &AppState,
    sku: &str,
    user_id: i64,
    sig: &str,
) -> Result<CreatedOrder, ApiError> {
    let product = find_product(sku).ok_or_else(|| ApiError::NotFound(sku.to_string()))?;
    // Links are signed over the canonical SKU
    if !state.signer.verify(user_id, product.sku, sig) {
        return Err(ApiError::Forbidden);
    }
    Ok(open_order(state, product, user_id).await?)
}

async fn open_order(
    state: &AppState,
    product: &Product,
    user_id: i64,
) -> Result<CreatedOrder, PaymentError> {
    let public_url = &state.config.server.public_url;
    let request = OrderRequest {
        product,
        buyer: BuyerReference {
            user_id,
            sku: product.sku.to_string(),
        },
        currency: &state.config.paypal.currency,
        brand_name: &state.config.paypal.brand_name,
        return_url: format!("{}/paypal/return", public_url),
        cancel_url: format!("{}/cancel", public_url),
    };
    state.paypal.create_order(&request).await
}

async fn capture_and_fulfil(
    state: &AppState,
    order_id: &str,
) -> Result<(String, FulfilmentOutcome), PaymentError> {
    let capture = state.paypal.capture_order(order_id).await?;
    let outcome = state.fulfilment.fulfil(&capture).await?;
    info!(%order_id, capture_id = %capture.capture_id, outcome = outcome.label(), "Order captured");
    Ok((capture.capture_id, outcome))
}
