//! Bot construction and command registration.

use std::time::Duration;

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config::Settings;

const NETWORK_TIMEOUT: Duration = Duration::from_secs(30);

/// Bot commands with the descriptions shown in the Telegram UI.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Я умею:")]
pub enum Command {
    #[command(description = "начать работу с ботом")]
    Start,
    #[command(description = "создать новую заявку")]
    New,
    #[command(description = "пропустить шаг с фото")]
    Skip,
    #[command(description = "отменить создание заявки")]
    Cancel,
    #[command(description = "показать свой Telegram ID")]
    Myid,
    #[command(description = "список пользователей (только для администратора)")]
    Listusers,
    /// Payload: `<telegram_id> <роль> [имя]`.
    #[command(description = "добавить пользователя (только для администратора)")]
    Adduser(String),
    /// Payload: `<telegram_id>`.
    #[command(description = "удалить пользователя (только для администратора)")]
    Deluser(String),
}

pub fn create_bot(settings: &Settings) -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(NETWORK_TIMEOUT).build()?;
    Ok(Bot::with_client(settings.bot_token.clone(), client))
}

/// Commands shown in the Telegram menu. Admin and dialogue-internal
/// commands stay unlisted.
const MENU_COMMANDS: [&str; 4] = ["start", "new", "cancel", "myid"];

/// Registers the user-facing subset of `Command` in the Telegram menu,
/// reusing the descriptions from the derive.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(menu_commands()).await?;
    Ok(())
}

/// The derive emits the `/` prefix in `command`, the comparison
/// ignores it.
fn menu_commands() -> Vec<teloxide::types::BotCommand> {
    Command::bot_commands()
        .into_iter()
        .filter(|c| MENU_COMMANDS.contains(&c.command.trim_start_matches('/')))
        .collect()
}
