use super::broadcast::broadcast;
use super::menu::{self, Screen, View};
use super::{BotState, Command, HandlerResult};
use crate::catalog::{entitlement, find_reward};
use crate::communication::error_handler::map_database_error_to_user_message;
use crate::configuration::Config;
use crate::database::NewUser;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::html;
use teloxide::{ApiError, RequestError};
use tracing::{debug, error, info, warn};

const ADMIN_ONLY: &str = "❌ Nur der Admin darf diesen Befehl verwenden.";

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> HandlerResult {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let user_id = from.id.0 as i64;

    if !command_allowed(&cmd, user_id, &state.config) {
        bot.send_message(msg.chat.id, ADMIN_ONLY).await?;
        return Ok(());
    }

    match cmd {
        Command::Start => {
            match state.database.register_user(&NewUser::from(from)).await {
                Ok(true) => info!(%user_id, "New user registered"),
                Ok(false) => debug!(%user_id, "Known user pressed /start"),
                // The menu works without a stored row, so keep going
                Err(e) => error!(%user_id, error = %e, "Failed to save user"),
            }
            send_view(&bot, msg.chat.id, menu::home(&state.config.telegram)).await?;
        }
        Command::Admin => {
            send_view(&bot, msg.chat.id, menu::admin()).await?;
        }
        Command::Broadcast(text) => {
            let text = text.trim();
            if text.is_empty() {
                send_view(&bot, msg.chat.id, menu::broadcast_info()).await?;
                return Ok(());
            }

            let user_ids = match state.database.list_user_ids().await {
                Ok(ids) => ids,
                Err(e) => {
                    error!(error = %e, "Failed to load users for broadcast");
                    bot.send_message(msg.chat.id, map_database_error_to_user_message(&e))
                        .await?;
                    return Ok(());
                }
            };

            info!(%user_id, recipients = user_ids.len(), "Starting broadcast");
            let report = broadcast(
                state.notifier.as_ref(),
                &user_ids,
                &html::escape(text),
                state.config.telegram.broadcast_concurrency,
            )
            .await;

            bot.send_message(
                msg.chat.id,
                format!(
                    "📢 Broadcast fertig.\n✅ Gesendet: {}\n❌ Fehlgeschlagen: {}",
                    report.sent, report.failed
                ),
            )
            .await?;
        }
    }
    Ok(())
}

pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<BotState>) -> HandlerResult {
    let user_id = q.from.id.0 as i64;
    let Some(screen) = q.data.as_deref().and_then(Screen::from_callback) else {
        warn!(%user_id, data = ?q.data, "Unknown callback data");
        bot.answer_callback_query(q.id.clone())
            .text("Unbekannte Auswahl")
            .await?;
        return Ok(());
    };

    if !screen_allowed(&screen, user_id, &state.config) {
        debug!(%user_id, ?screen, "Admin screen requested by non-admin");
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    }

    let view = render(&screen, user_id, &state).await;
    bot.answer_callback_query(q.id.clone()).await?;

    match &q.message {
        Some(message) => edit_view(&bot, message, view).await,
        None => send_view(&bot, ChatId(user_id), view).await,
    }
}

async fn render(screen: &Screen, user_id: i64, state: &BotState) -> View {
    let today = entitlement::today();

    match screen {
        Screen::Home => menu::home(&state.config.telegram),
        Screen::Info => menu::info(),
        Screen::Rules => menu::rules(),
        Screen::Menu => menu::shop(
            &state.signer,
            &state.config.server.public_url,
            user_id,
            &state.config.paypal.currency,
        ),
        Screen::MyArea => match state.database.get_user(user_id).await {
            Ok(user) => menu::my_area(user.as_ref(), today),
            Err(e) => error_view(user_id, &e),
        },
        Screen::RedeemList => redeem_list(user_id, state).await,
        Screen::Redeem(reward_id) => {
            let Some(reward) = find_reward(reward_id) else {
                warn!(%user_id, %reward_id, "Unknown reward");
                return redeem_list(user_id, state).await;
            };
            match state
                .database
                .redeem_points(user_id, reward.cost, reward.name)
                .await
            {
                Ok(outcome) => {
                    info!(%user_id, reward = reward.id, ?outcome, "Redeem points");
                    menu::redeem_result(reward, &outcome)
                }
                Err(e) => error_view(user_id, &e),
            }
        }
        Screen::Admin => menu::admin(),
        Screen::AdminStats => match state.database.count_users().await {
            Ok(count) => menu::admin_stats(count),
            Err(e) => error_view(user_id, &e),
        },
        Screen::AdminBroadcastInfo => menu::broadcast_info(),
    }
}

async fn redeem_list(user_id: i64, state: &BotState) -> View {
    match state.database.get_user(user_id).await {
        Ok(Some(user)) => menu::redeem_list(user.punkte),
        Ok(None) => menu::my_area(None, entitlement::today()),
        Err(e) => error_view(user_id, &e),
    }
}

fn command_allowed(cmd: &Command, user_id: i64, config: &Config) -> bool {
    match cmd {
        Command::Start => true,
        Command::Admin | Command::Broadcast(_) => config.is_admin(user_id),
    }
}

fn screen_allowed(screen: &Screen, user_id: i64, config: &Config) -> bool {
    !screen.is_admin_only() || config.is_admin(user_id)
}

fn error_view(user_id: i64, e: &crate::database::DatabaseError) -> View {
    error!(%user_id, error = %e, "Store error while rendering menu");
    let mut view = menu::my_area(None, entitlement::today());
    view.text = map_database_error_to_user_message(e);
    view
}

async fn send_view(bot: &Bot, chat_id: ChatId, view: View) -> HandlerResult {
    bot.send_message(chat_id, view.text)
        .parse_mode(ParseMode::Html)
        .reply_markup(view.keyboard)
        .await?;
    Ok(())
}

async fn edit_view(bot: &Bot, message: &Message, view: View) -> HandlerResult {
    let result = bot
        .edit_message_text(message.chat.id, message.id, view.text)
        .parse_mode(ParseMode::Html)
        .reply_markup(view.keyboard)
        .await;

    match result {
        Ok(_) => Ok(()),
        // Pressing the same button twice
        Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
