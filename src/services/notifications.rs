//! Outbound notifications: tech-chat request cards and admin alerts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures_util::future::BoxFuture;
use teloxide::error_handlers::ErrorHandler;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use teloxide::utils::html;

use crate::core::config::Settings;
use crate::models::request::MaintenanceRequest;

/// Telegram message hard limit.
const MAX_MESSAGE_LEN: usize = 4096;

pub const ACCEPT_CALLBACK_PREFIX: &str = "accept_req";
pub const COMPLETE_CALLBACK_PREFIX: &str = "complete_req";
pub const DELETE_USER_CALLBACK_PREFIX: &str = "delete_user";

/// Renders a UTC timestamp in the display timezone the way the staff
/// chat expects it, e.g. `07.03.2026 в 14:05`.
pub fn format_datetime(ts: Option<DateTime<Utc>>, tz: Tz) -> String {
    match ts {
        Some(ts) => ts.with_timezone(&tz).format("%d.%m.%Y в %H:%M").to_string(),
        None => "не указано".to_string(),
    }
}

pub fn new_request_text(request: &MaintenanceRequest, tz: Tz) -> String {
    format!(
        "🆕 <b>Новая заявка №{}</b>\n\n📍 Локация: {}\n🔧 Тип: {}\n👤 Автор: {}\n🕒 Создана: {}",
        html::escape(&request.short_id()),
        html::escape(request.location.as_deref().unwrap_or("не указана")),
        html::escape(request.issue_type.as_deref().unwrap_or("не указан")),
        html::escape(&request.reporter_name),
        format_datetime(Some(request.created_at), tz),
    )
}

pub fn new_request_keyboard(request: &MaintenanceRequest) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![InlineKeyboardButton::callback(
        "✅ Принять в работу",
        format!("{ACCEPT_CALLBACK_PREFIX}:{}", request.request_uuid),
    )]];
    if let Some(url) = &request.photo_before_url {
        if let Ok(url) = url.parse::<reqwest::Url>() {
            rows.push(vec![InlineKeyboardButton::url("📷 Фото", url)]);
        }
    }
    InlineKeyboardMarkup::new(rows)
}

/// Sends the new-request card to the technical-service chat.
pub async fn send_new_request(bot: &Bot, settings: &Settings, request: &MaintenanceRequest) {
    let text = new_request_text(request, settings.display_timezone);
    let result = bot
        .send_message(ChatId(settings.tech_chat_id), text)
        .parse_mode(ParseMode::Html)
        .reply_markup(new_request_keyboard(request))
        .await;
    if let Err(err) = result {
        log::error!(
            "failed to notify tech chat about request {}: {err}",
            request.request_uuid
        );
    }
}

/// Forwards `text` to every admin, split at the Telegram message limit.
pub async fn notify_admins(bot: &Bot, settings: &Settings, text: &str) {
    for chunk in split_chunks(text, MAX_MESSAGE_LEN) {
        for admin_id in &settings.admin_ids {
            if let Err(err) = bot.send_message(ChatId(*admin_id), chunk.clone()).await {
                log::warn!("failed to notify admin {admin_id}: {err}");
            }
        }
    }
}

/// Dispatcher-level error handler: logs the error and forwards its
/// text to the admins.
pub struct AdminErrorHandler {
    bot: Bot,
    settings: Arc<Settings>,
}

impl AdminErrorHandler {
    pub fn new(bot: Bot, settings: Arc<Settings>) -> Arc<Self> {
        Arc::new(Self { bot, settings })
    }
}

impl<E> ErrorHandler<E> for AdminErrorHandler
where
    E: std::fmt::Display + Send + 'static,
{
    fn handle_error(self: Arc<Self>, error: E) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let text = format!("❌ Ошибка обработчика: {error}");
            log::error!("{text}");
            notify_admins(&self.bot, &self.settings, &text).await;
        })
    }
}

/// Splits on char boundaries so multi-byte text never lands mid-char.
fn split_chunks(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if current.len() + ch.len_utf8() > max_len {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}
