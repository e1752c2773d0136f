//! Remontnik: Telegram bot for hotel maintenance requests.
//!
//! Staff file requests through a guided dialogue; requests land in a
//! Google Sheet, photos go to a Drive folder, and the technical-service
//! chat gets a card with inline accept/complete buttons.

pub mod cli;
pub mod core;
pub mod google;
pub mod models;
pub mod services;
pub mod telegram;

pub use crate::core::{AppError, AppResult, Settings};
