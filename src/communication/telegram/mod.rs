use crate::communication::notifier::{Notifier, TelegramNotifier};
use crate::configuration::{Config, Context};
use crate::core::service_manager::{Error as ServiceManagerError, Service};
use crate::database::UserStore;
use crate::payments::LinkSigner;
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use thiserror::Error;
use tracing::info;

pub mod broadcast;
mod handlers;
pub mod menu;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Invalid webhook secret for pay links")]
    LinkSecretError,
}

pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type HandlerResult = Result<(), HandlerError>;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Verfügbare Befehle:")]
pub enum Command {
    #[command(description = "Menü öffnen")]
    Start,
    #[command(description = "Admin-Menü")]
    Admin,
    #[command(description = "Nachricht an alle User senden")]
    Broadcast(String),
}

/// Shared by every handler through the dispatcher dependencies
pub struct BotState {
    pub config: Config,
    pub database: Arc<dyn UserStore>,
    pub signer: LinkSigner,
    pub notifier: Arc<dyn Notifier>,
}

pub struct TelegramService {
    bot: Bot,
    state: Arc<BotState>,
}

#[async_trait]
impl Service for TelegramService {
    type Context = Context;
    const NAME: &'static str = "telegram";

    async fn new(context: Context) -> Result<Self, ServiceManagerError> {
        let signer = LinkSigner::new(&context.secrets.webhook_secret)
            .map_err(|_| ServiceManagerError::from(TelegramError::LinkSecretError))?;
        let state = BotState {
            config: context.config,
            database: context.database,
            signer,
            notifier: Arc::new(TelegramNotifier::new(context.bot.clone())),
        };

        Ok(Self {
            bot: context.bot,
            state: Arc::new(state),
        })
    }

    async fn run(self) -> Result<(), ServiceManagerError> {
        self.bot
            .set_my_commands(Command::bot_commands())
            .await
            .map_err(ServiceManagerError::from)?;

        info!("Telegram dispatcher running");
        Dispatcher::builder(self.bot, schema())
            .dependencies(dptree::deps![self.state])
            .default_handler(|_| async {})
            .build()
            .dispatch()
            .await;
        Ok(())
    }
}

pub fn schema() -> UpdateHandler<HandlerError> {
    let commands = Update::filter_message()
        .filter_command::<Command>()
        .endpoint(handlers::handle_command);

    let callbacks = Update::filter_callback_query().endpoint(handlers::handle_callback);

    dptree::entry().branch(commands).branch(callbacks)
}
