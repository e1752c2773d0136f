//! Google Drive v3 uploads for request photos.

use std::sync::Arc;

use serde_json::json;

use crate::core::error::{AppError, AppResult};
use crate::core::retry::{retry, RetryConfig};
use crate::google::auth::TokenProvider;
use crate::google::check_json;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";
const MULTIPART_BOUNDARY: &str = "remontnik_upload_boundary";

pub struct DriveClient {
    http: reqwest::Client,
    auth: Arc<TokenProvider>,
    base_url: String,
    folder_id: String,
    retry_config: RetryConfig,
}

impl DriveClient {
    pub fn new(http: reqwest::Client, auth: Arc<TokenProvider>, folder_id: String) -> Self {
        Self::with_base_url(http, auth, folder_id, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(
        http: reqwest::Client,
        auth: Arc<TokenProvider>,
        folder_id: String,
        base_url: String,
    ) -> Self {
        Self { http, auth, base_url, folder_id, retry_config: RetryConfig::google_api() }
    }

    pub fn with_retry(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Uploads photo bytes into the configured folder, makes the file
    /// link-readable and returns its `webViewLink`.
    pub async fn upload_photo(&self, file_name: &str, bytes: &[u8]) -> AppResult<String> {
        let token = self.auth.access_token().await?;
        let url = format!(
            "{}/upload/drive/v3/files?uploadType=multipart&fields=id,webViewLink",
            self.base_url
        );
        let body = multipart_related(file_name, &self.folder_id, bytes);

        let uploaded = retry(&self.retry_config, || async {
            let response = self
                .http
                .post(&url)
                .bearer_auth(&token)
                .header(
                    reqwest::header::CONTENT_TYPE,
                    format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
                )
                .body(body.clone())
                .send()
                .await?;
            check_json(response).await
        })
        .await?;

        let file_id = uploaded["id"]
            .as_str()
            .ok_or_else(|| AppError::Drive("upload response missing file id".to_string()))?
            .to_string();
        let link = uploaded["webViewLink"]
            .as_str()
            .ok_or_else(|| AppError::Drive("upload response missing webViewLink".to_string()))?
            .to_string();

        self.share_with_anyone(&token, &file_id).await?;
        log::info!("uploaded {file_name} to Drive as {file_id}");
        Ok(link)
    }

    /// Grants link access so the photo button in the tech chat works
    /// for everyone.
    async fn share_with_anyone(&self, token: &str, file_id: &str) -> AppResult<()> {
        let url = format!("{}/drive/v3/files/{file_id}/permissions", self.base_url);
        let payload = json!({ "type": "anyone", "role": "reader" });
        retry(&self.retry_config, || async {
            let response =
                self.http.post(&url).bearer_auth(token).json(&payload).send().await?;
            check_json(response).await
        })
        .await?;
        Ok(())
    }
}

/// Builds a `multipart/related` body: a JSON metadata part followed by
/// the media part, as the Drive multipart upload endpoint expects.
fn multipart_related(file_name: &str, folder_id: &str, bytes: &[u8]) -> Vec<u8> {
    let metadata = json!({ "name": file_name, "parents": [folder_id] });
    let mut body = Vec::with_capacity(bytes.len() + 512);
    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!("--{MULTIPART_BOUNDARY}\r\nContent-Type: image/jpeg\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_body_carries_metadata_and_media() {
        let body = multipart_related("request_x.jpg", "folder-1", b"JPEGDATA");
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains(r#""name":"request_x.jpg""#));
        assert!(text.contains(r#""parents":["folder-1"]"#));
        assert!(text.contains("Content-Type: image/jpeg"));
        assert!(text.contains("JPEGDATA"));
        assert!(text.ends_with(&format!("--{MULTIPART_BOUNDARY}--\r\n")));
    }
}
