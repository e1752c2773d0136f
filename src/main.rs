//! Binary entry point.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;

use remontnik::cli::{self, Commands};
use remontnik::core::config::Settings;
use remontnik::core::error::{AppError, AppResult};
use remontnik::core::logging;
use remontnik::google::auth::{ServiceAccountKey, TokenProvider};
use remontnik::google::drive::DriveClient;
use remontnik::google::sheets::SheetsClient;
use remontnik::services::users::UserService;
use remontnik::telegram;
use remontnik::telegram::request::RequestState;
use remontnik::telegram::schema::HandlerDeps;

const DEFAULT_LOG_PATH: &str = "remontnik.log";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::parse_args();

    // .env is optional, deployments set the environment directly
    let _ = dotenvy::dotenv();

    let log_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| DEFAULT_LOG_PATH.to_string());
    logging::init_logger(Path::new(&log_path))?;

    match cli.command {
        Some(Commands::CheckConfig) => check_config(),
        Some(Commands::Run) | None => run().await,
    }
}

/// Fail-fast startup validation: environment first, then the
/// credentials artifact. Nothing talks to the network yet.
fn load_settings() -> AppResult<(Settings, ServiceAccountKey)> {
    let settings = Settings::from_env().map_err(AppError::Config)?;
    let key = ServiceAccountKey::from_file(&settings.credentials_path)?;
    Ok((settings, key))
}

fn check_config() -> anyhow::Result<()> {
    let (settings, key) = load_settings()?;
    log::info!("configuration OK");
    log::info!("admins: {:?}", settings.admin_ids);
    log::info!("tech chat: {}", settings.tech_chat_id);
    log::info!("issue types: {}", settings.issue_types.join(", "));
    log::info!("timezone: {}", settings.display_timezone);
    log::info!("service account: {}", key.client_email);
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let (settings, key) = load_settings()?;
    let settings = Arc::new(settings);

    log::info!("starting remontnik v{}", env!("CARGO_PKG_VERSION"));
    log::info!("service account: {}", key.client_email);

    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    let auth = Arc::new(TokenProvider::new(key, http.clone()));
    let sheets = Arc::new(SheetsClient::new(
        http.clone(),
        Arc::clone(&auth),
        settings.google_sheet_id.clone(),
    ));
    let drive = Arc::new(DriveClient::new(http, auth, settings.google_drive_folder_id.clone()));
    let users = Arc::new(UserService::new(Arc::clone(&sheets)));

    let bot = telegram::create_bot(&settings)?;
    telegram::setup_bot_commands(&bot).await.context("failed to register bot commands")?;

    let error_handler =
        remontnik::services::notifications::AdminErrorHandler::new(bot.clone(), Arc::clone(&settings));
    let deps = HandlerDeps { settings, sheets, drive, users };

    log::info!("bot is ready, entering long-poll loop");
    Dispatcher::builder(bot, telegram::schema())
        .dependencies(dptree::deps![deps, InMemStorage::<RequestState>::new()])
        .default_handler(|upd| async move {
            log::debug!("unhandled update: {:?}", upd.kind);
        })
        .error_handler(error_handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("bot stopped");
    Ok(())
}
