//! Admin-only user management: /listusers, /adduser, /deluser and the
//! delete-user inline button.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use teloxide::utils::html;

use super::schema::{HandlerDeps, HandlerResult};
use crate::models::user::{Role, User};
use crate::services::notifications::DELETE_USER_CALLBACK_PREFIX;

/// Admins are the ids from `ADMIN_IDS` plus anyone with the admin role
/// in the sheet. The env list bootstraps an empty worksheet.
async fn is_admin(deps: &HandlerDeps, user_id: i64) -> bool {
    deps.settings.is_admin(user_id) || deps.users.has_role(user_id, &[Role::Admin]).await
}

async fn ensure_admin(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<bool, teloxide::RequestError> {
    let Some(from) = msg.from.as_ref() else { return Ok(false) };
    if is_admin(deps, from.id.0 as i64).await {
        return Ok(true);
    }
    bot.send_message(msg.chat.id, "Команда доступна только администраторам.").await?;
    Ok(false)
}

pub async fn list_users(bot: Bot, msg: Message, deps: HandlerDeps) -> HandlerResult {
    if !ensure_admin(&bot, &msg, &deps).await? {
        return Ok(());
    }
    let users = deps.users.get_all().await;
    if users.is_empty() {
        bot.send_message(msg.chat.id, "Список пользователей пуст.").await?;
        return Ok(());
    }
    for user in users {
        let card = format!(
            "👤 <b>{}</b>\nID: <code>{}</code>\nРоль: {}",
            html::escape(&user.name),
            user.telegram_id,
            user.role
        );
        let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            "🗑 Удалить",
            format!("{DELETE_USER_CALLBACK_PREFIX}:{}", user.telegram_id),
        )]]);
        bot.send_message(msg.chat.id, card)
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard)
            .await?;
    }
    Ok(())
}

/// `/adduser <telegram_id> <роль> [имя]`
pub async fn add_user(bot: Bot, msg: Message, deps: HandlerDeps, args: String) -> HandlerResult {
    if !ensure_admin(&bot, &msg, &deps).await? {
        return Ok(());
    }
    let mut parts = args.split_whitespace();
    let (Some(id_raw), Some(role_raw)) = (parts.next(), parts.next()) else {
        bot.send_message(
            msg.chat.id,
            format!(
                "Формат: /adduser <telegram_id> <роль> [имя]\nРоли: {}",
                Role::KNOWN.join(", ")
            ),
        )
        .await?;
        return Ok(());
    };
    let Ok(telegram_id) = id_raw.parse::<i64>() else {
        bot.send_message(msg.chat.id, "telegram_id должен быть числом.").await?;
        return Ok(());
    };
    let role = role_raw
        .to_lowercase()
        .parse::<Role>()
        .unwrap_or(Role::Other(role_raw.to_string()));
    if !role.is_known() {
        bot.send_message(
            msg.chat.id,
            format!("Неизвестная роль «{role_raw}». Доступны: {}", Role::KNOWN.join(", ")),
        )
        .await?;
        return Ok(());
    }
    if deps.users.get(telegram_id).await.is_some() {
        bot.send_message(msg.chat.id, "Пользователь с таким ID уже есть.").await?;
        return Ok(());
    }

    let name = parts.collect::<Vec<_>>().join(" ");
    deps.users.add(&User { telegram_id, name, role }).await?;
    bot.send_message(msg.chat.id, format!("Пользователь {telegram_id} добавлен.")).await?;
    Ok(())
}

/// `/deluser <telegram_id>`
pub async fn delete_user(bot: Bot, msg: Message, deps: HandlerDeps, args: String) -> HandlerResult {
    if !ensure_admin(&bot, &msg, &deps).await? {
        return Ok(());
    }
    let Some(id_raw) = args.split_whitespace().next() else {
        bot.send_message(msg.chat.id, "Формат: /deluser <telegram_id>").await?;
        return Ok(());
    };
    let Ok(telegram_id) = id_raw.parse::<i64>() else {
        bot.send_message(msg.chat.id, "telegram_id должен быть числом.").await?;
        return Ok(());
    };
    let reply = if deps.users.delete(telegram_id).await? {
        format!("Пользователь {telegram_id} удалён.")
    } else {
        format!("Пользователь {telegram_id} не найден.")
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

/// The 🗑 button under a /listusers card.
pub async fn delete_user_callback(
    bot: Bot,
    q: CallbackQuery,
    deps: HandlerDeps,
    id_raw: String,
) -> HandlerResult {
    if !is_admin(&deps, q.from.id.0 as i64).await {
        bot.answer_callback_query(q.id).text("Недостаточно прав").await?;
        return Ok(());
    }
    let Ok(telegram_id) = id_raw.parse::<i64>() else {
        bot.answer_callback_query(q.id).text("Некорректный ID").await?;
        return Ok(());
    };
    let deleted = deps.users.delete(telegram_id).await?;
    bot.answer_callback_query(q.id.clone())
        .text(if deleted { "Пользователь удалён" } else { "Пользователь не найден" })
        .await?;
    if deleted {
        if let Some(m) = q.message.as_ref() {
            let _ = bot
                .edit_message_text(m.chat().id, m.id(), format!("🗑 Пользователь {telegram_id} удалён"))
                .await;
        }
    }
    Ok(())
}
