use chiara_bot::communication::telegram::TelegramService;
use chiara_bot::communication::webshop::WebshopService;
use chiara_bot::configuration::Context;
use chiara_bot::core::ServiceManager;
use chiara_bot::AppError;
use dotenvy::dotenv;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenv().ok();
    let context =
        Context::new("config.json").map_err(|e| AppError::ConfigError(e.to_string()))?;

    let log_level = Level::from_str(&context.config.log_level).unwrap_or(Level::INFO);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(log_level.to_string()))
        .init();
    tracing::info!(
        public_url = %context.config.server.public_url,
        paypal = ?context.config.paypal.environment,
        "Starting ChiaraBot"
    );
    context.store_backend.log_selection();

    let mut service_manager = ServiceManager::new(context);
    service_manager.spawn::<WebshopService>();
    service_manager.spawn::<TelegramService>();

    service_manager
        .wait()
        .await
        .map_err(|_| AppError::ServiceError)
}
