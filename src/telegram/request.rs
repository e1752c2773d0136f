//! The request dialogue (/new → location → issue type → photo) and the
//! accept/complete callbacks on the tech-chat card.

use chrono::Utc;
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::prelude::*;
use teloxide::types::{
    ChatId, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
    KeyboardRemove, MaybeInaccessibleMessage,
};

use super::files;
use super::schema::{HandlerDeps, HandlerResult};
use crate::models::request::MaintenanceRequest;
use crate::models::user::Role;
use crate::services::{notifications, requests};

pub type RequestDialogue = Dialogue<RequestState, InMemStorage<RequestState>>;

/// Conversation state of the request-creation dialogue.
#[derive(Clone, Default)]
pub enum RequestState {
    #[default]
    Idle,
    AwaitingLocation {
        request: MaintenanceRequest,
    },
    AwaitingIssueType {
        request: MaintenanceRequest,
    },
    AwaitingPhoto {
        request: MaintenanceRequest,
    },
}

pub async fn start_request(
    bot: Bot,
    msg: Message,
    dialogue: RequestDialogue,
    deps: HandlerDeps,
) -> HandlerResult {
    let Some(from) = msg.from.as_ref() else { return Ok(()) };
    let user_id = from.id.0 as i64;

    let Some(user) = deps.users.get(user_id).await else {
        return super::commands::refuse_and_report(bot, msg, deps).await;
    };
    if !matches!(user.role, Role::Housekeeper | Role::Admin) {
        bot.send_message(msg.chat.id, "Создавать заявки могут только горничные и администраторы.")
            .await?;
        return Ok(());
    }

    let display_name = if user.name.is_empty() { from.first_name.clone() } else { user.name };
    let request = MaintenanceRequest::new(user_id, display_name);
    dialogue.update(RequestState::AwaitingLocation { request }).await?;
    bot.send_message(msg.chat.id, "📍 Укажите локацию (например, «номер 204» или «прачечная»):")
        .await?;
    Ok(())
}

pub async fn receive_location(
    bot: Bot,
    msg: Message,
    dialogue: RequestDialogue,
    mut request: MaintenanceRequest,
    deps: HandlerDeps,
) -> HandlerResult {
    let text = msg.text().map(str::trim).unwrap_or_default();
    if text.is_empty() || text.starts_with('/') {
        bot.send_message(msg.chat.id, "Пожалуйста, отправьте локацию текстом (или /cancel).")
            .await?;
        return Ok(());
    }

    request.location = Some(text.to_string());
    let keyboard = issue_type_keyboard(&deps.settings.issue_types);
    dialogue.update(RequestState::AwaitingIssueType { request }).await?;
    bot.send_message(msg.chat.id, "🔧 Выберите тип проблемы:").reply_markup(keyboard).await?;
    Ok(())
}

pub async fn receive_issue_type(
    bot: Bot,
    msg: Message,
    dialogue: RequestDialogue,
    mut request: MaintenanceRequest,
    deps: HandlerDeps,
) -> HandlerResult {
    let text = msg.text().map(str::trim).unwrap_or_default();
    if !deps.settings.issue_types.iter().any(|t| t == text) {
        bot.send_message(msg.chat.id, "Пожалуйста, выберите тип кнопкой ниже (или /cancel).")
            .reply_markup(issue_type_keyboard(&deps.settings.issue_types))
            .await?;
        return Ok(());
    }

    request.issue_type = Some(text.to_string());
    dialogue.update(RequestState::AwaitingPhoto { request }).await?;
    bot.send_message(msg.chat.id, "📷 Пришлите фото проблемы или /skip, чтобы пропустить.")
        .reply_markup(KeyboardRemove::new())
        .await?;
    Ok(())
}

pub async fn receive_photo(
    bot: Bot,
    msg: Message,
    dialogue: RequestDialogue,
    mut request: MaintenanceRequest,
    deps: HandlerDeps,
) -> HandlerResult {
    // Telegram sorts sizes ascending, the last one is the original.
    let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) else {
        bot.send_message(msg.chat.id, "Нужно фото. Пришлите снимок или /skip.").await?;
        return Ok(());
    };
    request.photo_file_id = Some(photo.file.id.0.clone());
    dialogue.exit().await?;
    submit(bot, msg.chat.id, deps, request).await
}

pub async fn skip_photo(
    bot: Bot,
    msg: Message,
    dialogue: RequestDialogue,
    request: MaintenanceRequest,
    deps: HandlerDeps,
) -> HandlerResult {
    dialogue.exit().await?;
    submit(bot, msg.chat.id, deps, request).await
}

pub async fn cancel(bot: Bot, msg: Message, dialogue: RequestDialogue) -> HandlerResult {
    dialogue.exit().await?;
    bot.send_message(msg.chat.id, "Создание заявки отменено.")
        .reply_markup(KeyboardRemove::new())
        .await?;
    Ok(())
}

fn issue_type_keyboard(issue_types: &[String]) -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = issue_types
        .chunks(2)
        .map(|pair| pair.iter().map(|t| KeyboardButton::new(t.clone())).collect())
        .collect();
    KeyboardMarkup::new(rows).resize_keyboard().one_time_keyboard()
}

/// Persists the request and notifies the tech chat. With a photo the
/// write goes through the transactional path in `services::requests`.
async fn submit(
    bot: Bot,
    chat_id: ChatId,
    deps: HandlerDeps,
    mut request: MaintenanceRequest,
) -> HandlerResult {
    match request.photo_file_id.clone() {
        None => requests::store(&deps.sheets, &mut request).await?,
        Some(file_id) => {
            let stored = match files::download_photo(&bot, &file_id).await {
                Ok(bytes) => {
                    requests::store_with_photo(&deps.sheets, &deps.drive, &mut request, &bytes)
                        .await
                }
                Err(err) => Err(err),
            };
            if let Err(err) = stored {
                notifications::notify_admins(
                    &bot,
                    &deps.settings,
                    &format!("❌ Ошибка создания заявки {}: {err}", request.request_uuid),
                )
                .await;
                bot.send_message(
                    chat_id,
                    "❌ Не удалось загрузить фото. Заявка не создана, попробуйте ещё раз.",
                )
                .await?;
                return Ok(());
            }
        }
    }

    notifications::send_new_request(&bot, &deps.settings, &request).await;
    bot.send_message(chat_id, format!("✅ Заявка №{} создана. Техслужба уведомлена.", request.short_id()))
        .await?;
    Ok(())
}

// ── tech-chat card callbacks ────────────────────────────────────────

pub async fn accept(bot: Bot, q: CallbackQuery, deps: HandlerDeps, uuid: String) -> HandlerResult {
    let from_id = q.from.id.0 as i64;
    let Some(user) = deps.users.get(from_id).await else {
        bot.answer_callback_query(q.id).text("У вас нет доступа").await?;
        return Ok(());
    };
    if !matches!(user.role, Role::Technician | Role::Admin) {
        bot.answer_callback_query(q.id).text("Принимать заявки могут только техники").await?;
        return Ok(());
    }

    let display_name =
        if user.name.is_empty() { q.from.first_name.clone() } else { user.name.clone() };
    if !deps.sheets.accept_request(&uuid, from_id, &display_name).await? {
        bot.answer_callback_query(q.id).text("Заявка уже взята в работу или не найдена").await?;
        return Ok(());
    }
    bot.answer_callback_query(q.id.clone()).text("Заявка принята").await?;
    log::info!("request {uuid} accepted by {from_id}");

    if let Some(MaybeInaccessibleMessage::Regular(m)) = q.message.as_ref() {
        let text = format!(
            "{}\n\n🔧 В работе: {display_name} ({})",
            m.text().unwrap_or_default(),
            notifications::format_datetime(Some(Utc::now()), deps.settings.display_timezone),
        );
        let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            "✅ Завершить",
            format!("{}:{uuid}", notifications::COMPLETE_CALLBACK_PREFIX),
        )]]);
        let _ = bot.edit_message_text(m.chat.id, m.id, text).reply_markup(keyboard).await;
    }
    Ok(())
}

pub async fn complete(
    bot: Bot,
    q: CallbackQuery,
    deps: HandlerDeps,
    uuid: String,
) -> HandlerResult {
    let from_id = q.from.id.0 as i64;
    let Some(user) = deps.users.get(from_id).await else {
        bot.answer_callback_query(q.id).text("У вас нет доступа").await?;
        return Ok(());
    };
    if !matches!(user.role, Role::Technician | Role::Admin) {
        bot.answer_callback_query(q.id).text("Завершать заявки могут только техники").await?;
        return Ok(());
    }

    if !deps.sheets.complete_request(&uuid, from_id).await? {
        bot.answer_callback_query(q.id)
            .text("Завершить может только исполнитель заявки в работе")
            .await?;
        return Ok(());
    }
    bot.answer_callback_query(q.id.clone()).text("Заявка завершена").await?;
    log::info!("request {uuid} completed by {from_id}");

    if let Some(MaybeInaccessibleMessage::Regular(m)) = q.message.as_ref() {
        let text = format!(
            "{}\n\n✅ Завершена: {}",
            m.text().unwrap_or_default(),
            notifications::format_datetime(Some(Utc::now()), deps.settings.display_timezone),
        );
        let cleared = InlineKeyboardMarkup::new(Vec::<Vec<InlineKeyboardButton>>::new());
        let _ = bot.edit_message_text(m.chat.id, m.id, text).reply_markup(cleared).await;
    }
    Ok(())
}
