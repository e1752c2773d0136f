pub mod config;
pub mod error;
pub mod logging;
pub mod retry;

pub use config::Settings;
pub use error::{AppError, AppResult};
