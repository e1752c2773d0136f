//! Downloading Telegram file content into memory.

use futures_util::StreamExt;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::FileId;

use crate::core::error::{AppError, AppResult};

/// Fetches a photo by file id. Request photos are at most a few
/// megabytes, buffering in memory is fine.
pub async fn download_photo(bot: &Bot, file_id: &str) -> AppResult<Vec<u8>> {
    let file = bot.get_file(FileId(file_id.to_owned())).await?;
    let mut stream = Box::pin(bot.download_file_stream(&file.path));
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk.map_err(AppError::Http)?);
    }
    Ok(buf)
}
