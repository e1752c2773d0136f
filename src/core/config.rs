//! Environment-driven configuration.
//!
//! All settings are read once at startup. A missing or malformed
//! required variable aborts startup before any Telegram or Google
//! client is constructed.

use std::path::PathBuf;

use chrono_tz::Tz;
use thiserror::Error;

pub const DEFAULT_ISSUE_TYPES: &str = "Сантехника,Электрика,Мебель,Другое";
pub const DEFAULT_TIMEZONE: &str = "Europe/Moscow";
pub const DEFAULT_CREDENTIALS_PATH: &str = "credentials.json";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Validated runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bot_token: String,
    pub admin_ids: Vec<i64>,
    pub tech_chat_id: i64,
    pub google_sheet_id: String,
    pub google_drive_folder_id: String,
    pub issue_types: Vec<String>,
    pub display_timezone: Tz,
    pub credentials_path: PathBuf,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through an arbitrary lookup function. Lets tests
    /// exercise validation without mutating process-global state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = required(&lookup, "BOT_TOKEN")?;
        let admin_ids = parse_id_list("ADMIN_IDS", &required(&lookup, "ADMIN_IDS")?)?;
        let tech_chat_id = required(&lookup, "TECH_CHAT_ID")?
            .parse::<i64>()
            .map_err(|e| ConfigError::Invalid { name: "TECH_CHAT_ID", reason: e.to_string() })?;
        let google_sheet_id = required(&lookup, "GOOGLE_SHEET_ID")?;
        let google_drive_folder_id = required(&lookup, "GOOGLE_DRIVE_FOLDER_ID")?;

        let issue_types: Vec<String> = optional(&lookup, "ISSUE_TYPES", DEFAULT_ISSUE_TYPES)
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if issue_types.is_empty() {
            return Err(ConfigError::Invalid {
                name: "ISSUE_TYPES",
                reason: "no issue types listed".to_string(),
            });
        }

        let display_timezone = optional(&lookup, "DISPLAY_TIMEZONE", DEFAULT_TIMEZONE)
            .parse::<Tz>()
            .map_err(|e| ConfigError::Invalid { name: "DISPLAY_TIMEZONE", reason: e.to_string() })?;

        let credentials_path =
            PathBuf::from(optional(&lookup, "GOOGLE_CREDENTIALS_PATH", DEFAULT_CREDENTIALS_PATH));

        Ok(Self {
            bot_token,
            admin_ids,
            tech_chat_id,
            google_sheet_id,
            google_drive_folder_id,
            issue_types,
            display_timezone,
            credentials_path,
        })
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn optional<F>(lookup: &F, name: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

fn parse_id_list(name: &'static str, raw: &str) -> Result<Vec<i64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|e| ConfigError::Invalid {
                name,
                reason: format!("{s:?}: {e}"),
            })
        })
        .collect()
}
