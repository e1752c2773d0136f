//! Common command handlers: /start, /myid and the fallback for
//! unmatched or unauthorized messages.

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::html;

use super::schema::{HandlerDeps, HandlerResult};
use crate::services::notifications;

pub async fn start(bot: Bot, msg: Message, deps: HandlerDeps) -> HandlerResult {
    let Some(from) = msg.from.as_ref() else { return Ok(()) };
    let user_id = from.id.0 as i64;

    let Some(known) = deps.users.get(user_id).await else {
        return refuse_and_report(bot, msg, deps).await;
    };

    // Keep the sheet name in sync with the Telegram profile.
    let current_name = from.first_name.clone();
    if !current_name.is_empty() && current_name != known.name {
        if let Err(err) = deps.users.rename(user_id, &current_name).await {
            log::warn!("failed to sync name for {user_id}: {err}");
        }
    }

    bot.send_message(
        msg.chat.id,
        format!(
            "Здравствуйте, {}! 👋\n\nЯ бот для подачи заявок на ремонт.\n\
             Создать заявку: /new\nОтменить: /cancel",
            html::escape(&current_name)
        ),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

pub async fn my_id(bot: Bot, msg: Message) -> HandlerResult {
    let Some(from) = msg.from.as_ref() else { return Ok(()) };
    bot.send_message(msg.chat.id, format!("Ваш Telegram ID: {}", from.id)).await?;
    Ok(())
}

/// Last branch of the message tree: stray text from known users gets a
/// hint, strangers get a refusal and the admins get a heads-up.
pub async fn fallback(bot: Bot, msg: Message, deps: HandlerDeps) -> HandlerResult {
    // Stay quiet in the tech chat, the bot only posts cards there.
    if msg.chat.id.0 == deps.settings.tech_chat_id {
        return Ok(());
    }
    let Some(from) = msg.from.as_ref() else { return Ok(()) };
    if deps.users.get(from.id.0 as i64).await.is_some() {
        bot.send_message(msg.chat.id, "Не понял вас. Создать заявку: /new").await?;
        return Ok(());
    }
    refuse_and_report(bot, msg, deps).await
}

pub(super) async fn refuse_and_report(bot: Bot, msg: Message, deps: HandlerDeps) -> HandlerResult {
    let Some(from) = msg.from.as_ref() else { return Ok(()) };
    bot.send_message(msg.chat.id, "У вас нет доступа к этому боту. Обратитесь к администратору.")
        .await?;

    let report = format!(
        "⚠️ Попытка доступа без прав:\nID: {}\nИмя: {}\nДобавить: /adduser {} housekeeper",
        from.id, from.first_name, from.id
    );
    notifications::notify_admins(&bot, &deps.settings, &report).await;
    Ok(())
}
