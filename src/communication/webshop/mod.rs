use crate::communication::notifier::{Notifier, TelegramNotifier};
use crate::configuration::{Config, Context};
use crate::core::service_manager::{Error as ServiceManagerError, Service};
use crate::database::UserStore;
use crate::payments::paypal::PaypalCredentials;
use crate::payments::{FulfilmentService, LinkSigner, PaypalClient, WebhookProcessor};
use async_trait::async_trait;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

mod pages;
mod routes;

#[derive(Debug, Error)]
pub enum WebshopError {
    #[error("Invalid webhook secret for pay links")]
    LinkSecretError,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub paypal: Arc<PaypalClient>,
    pub fulfilment: Arc<FulfilmentService>,
    pub webhook: Arc<WebhookProcessor>,
    pub signer: LinkSigner,
}

impl AppState {
    pub fn new(
        config: Config,
        paypal: PaypalClient,
        store: Arc<dyn UserStore>,
        notifier: Arc<dyn Notifier>,
        signer: LinkSigner,
    ) -> Self {
        let paypal = Arc::new(paypal);
        let fulfilment = Arc::new(FulfilmentService::new(
            store,
            notifier,
            &config.paypal.currency,
        ));
        let webhook = Arc::new(WebhookProcessor::new(paypal.clone(), fulfilment.clone()));

        Self {
            config: Arc::new(config),
            paypal,
            fulfilment,
            webhook,
            signer,
        }
    }
}

pub struct WebshopService {
    port: u16,
    state: AppState,
}

#[async_trait]
impl Service for WebshopService {
    type Context = Context;
    const NAME: &'static str = "webshop";

    async fn new(context: Context) -> Result<Self, ServiceManagerError> {
        let signer = LinkSigner::new(&context.secrets.webhook_secret)
            .map_err(|_| ServiceManagerError::from(WebshopError::LinkSecretError))?;
        let credentials = PaypalCredentials {
            client_id: context.secrets.paypal_client_id.clone(),
            client_secret: context.secrets.paypal_client_secret.clone(),
            webhook_id: context.secrets.paypal_webhook_id.clone(),
        };
        let paypal = PaypalClient::new(
            context.config.paypal.environment.api_base(),
            credentials,
            context.secrets.paypal_debug_webhook,
        );
        let notifier = Arc::new(TelegramNotifier::new(context.bot.clone()));

        Ok(Self {
            port: context.config.server.port,
            state: AppState::new(context.config, paypal, context.database, notifier, signer),
        })
    }

    async fn run(self) -> Result<(), ServiceManagerError> {
        let app = router(self.state);

        let listener = TcpListener::bind(format!("0.0.0.0:{}", self.port))
            .await
            .map_err(|e| ServiceManagerError::new(&format!("Failed to bind port: {}", e)))?;

        info!("Webshop HTTP server running on port {}", self.port);

        axum::serve(listener, app)
            .await
            .map_err(|e| ServiceManagerError::new(&format!("HTTP server error: {}", e)))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route(
            "/webhook/paypal",
            get(routes::webhook_health).post(routes::paypal_webhook),
        )
        .route(
            "/paypal/webhook",
            get(routes::webhook_alias_health).post(routes::paypal_webhook),
        )
        .route("/pay/{sku}", get(routes::pay))
        .route("/paypal/return", get(routes::paypal_return))
        .route("/success", get(routes::success))
        .route("/cancel", get(routes::cancel))
        .route("/create-order", post(routes::create_order))
        .route("/api/paypal/order", post(routes::create_order))
        .route("/api/paypal/capture", post(routes::capture_order))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
