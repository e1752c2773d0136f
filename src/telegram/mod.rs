//! Telegram layer: bot setup, handler schema and the handlers.

pub mod admin;
pub mod bot;
pub mod callbacks;
pub mod commands;
pub mod files;
pub mod request;
pub mod schema;

pub use bot::{create_bot, setup_bot_commands, Command};
pub use schema::{schema, HandlerDeps};
