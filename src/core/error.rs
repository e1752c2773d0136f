//! Application error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::config::ConfigError;

/// Unified error type for the bot.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("credentials file not found: {0}")]
    CredentialsMissing(PathBuf),

    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Google auth error: {0}")]
    Auth(String),

    #[error("spreadsheet error: {0}")]
    Sheets(String),

    #[error("Drive error: {0}")]
    Drive(String),

    #[error("JWT signing error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;
