//! Google API clients (Sheets v4, Drive v3) over plain REST.

pub mod auth;
pub mod drive;
pub mod sheets;

use serde_json::Value;

use crate::core::error::{AppError, AppResult};

/// Converts non-2xx responses into `HttpStatus` errors, otherwise
/// parses the JSON body.
pub(crate) async fn check_json(response: reqwest::Response) -> AppResult<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::HttpStatus { status, body });
    }
    Ok(response.json().await?)
}
