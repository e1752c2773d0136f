//! Callback query routing.

use teloxide::prelude::*;

use super::schema::{HandlerDeps, HandlerResult};
use super::{admin, request};
use crate::services::notifications::{
    ACCEPT_CALLBACK_PREFIX, COMPLETE_CALLBACK_PREFIX, DELETE_USER_CALLBACK_PREFIX,
};

pub async fn dispatch(bot: Bot, q: CallbackQuery, deps: HandlerDeps) -> HandlerResult {
    let Some(data) = q.data.clone() else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    match data.split_once(':') {
        Some((ACCEPT_CALLBACK_PREFIX, uuid)) => {
            request::accept(bot, q, deps, uuid.to_string()).await
        }
        Some((COMPLETE_CALLBACK_PREFIX, uuid)) => {
            request::complete(bot, q, deps, uuid.to_string()).await
        }
        Some((DELETE_USER_CALLBACK_PREFIX, id)) => {
            admin::delete_user_callback(bot, q, deps, id.to_string()).await
        }
        _ => {
            log::warn!("unknown callback data: {data}");
            bot.answer_callback_query(q.id).await?;
            Ok(())
        }
    }
}
