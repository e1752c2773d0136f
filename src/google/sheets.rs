//! Google Sheets v4 client and the worksheet operations the bot needs.
//!
//! The spreadsheet is the source of truth: staff live in the `users`
//! worksheet, requests in `requests`. The layout is positional, see the
//! column constants below.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::core::error::{AppError, AppResult};
use crate::core::retry::{retry, RetryConfig};
use crate::google::auth::TokenProvider;
use crate::google::check_json;
use crate::models::request::{rfc3339, MaintenanceRequest, RequestStatus};
use crate::models::user::User;

pub const USERS_WORKSHEET: &str = "users";
pub const REQUESTS_WORKSHEET: &str = "requests";

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

/// 1-based columns of the `requests` worksheet, matching
/// `MaintenanceRequest::to_row`.
mod req_col {
    pub const UUID: u32 = 1;
    pub const STATUS: u32 = 2;
    pub const PHOTO_URL: u32 = 5;
    pub const ASSIGNEE_ID: u32 = 9;
    pub const ASSIGNEE_NAME: u32 = 10;
    pub const ACCEPTED_AT: u32 = 11;
    pub const COMPLETED_AT: u32 = 12;
}

/// 1-based columns of the `users` worksheet.
mod user_col {
    pub const ID: u32 = 1;
    pub const NAME: u32 = 2;
}

pub struct SheetsClient {
    http: reqwest::Client,
    auth: Arc<TokenProvider>,
    base_url: String,
    spreadsheet_id: String,
    retry_config: RetryConfig,
    /// Serializes find-then-update sequences against each other.
    write_lock: Mutex<()>,
    /// Numeric sheet ids, resolved lazily (needed for row deletion).
    sheet_ids: Mutex<HashMap<String, i64>>,
}

impl SheetsClient {
    pub fn new(http: reqwest::Client, auth: Arc<TokenProvider>, spreadsheet_id: String) -> Self {
        Self::with_base_url(http, auth, spreadsheet_id, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(
        http: reqwest::Client,
        auth: Arc<TokenProvider>,
        spreadsheet_id: String,
        base_url: String,
    ) -> Self {
        Self {
            http,
            auth,
            base_url,
            spreadsheet_id,
            retry_config: RetryConfig::google_api(),
            write_lock: Mutex::new(()),
            sheet_ids: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_retry(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    // ── worksheet primitives ────────────────────────────────────────

    fn values_url(&self, range: &str) -> String {
        format!("{}/v4/spreadsheets/{}/values/{range}", self.base_url, self.spreadsheet_id)
    }

    /// Reads every row of a worksheet, header row included.
    pub async fn read_rows(&self, worksheet: &str) -> AppResult<Vec<Vec<String>>> {
        let token = self.auth.access_token().await?;
        let url = self.values_url(worksheet);
        let body = retry(&self.retry_config, || async {
            let response = self.http.get(&url).bearer_auth(&token).send().await?;
            check_json(response).await
        })
        .await?;
        let rows = body
            .get("values")
            .and_then(Value::as_array)
            .map(|rows| rows.iter().map(row_to_strings).collect())
            .unwrap_or_default();
        Ok(rows)
    }

    async fn append_row(&self, worksheet: &str, row: &[String]) -> AppResult<()> {
        let token = self.auth.access_token().await?;
        let url = format!("{}:append?valueInputOption=RAW", self.values_url(&format!("{worksheet}!A1")));
        let payload = json!({ "values": [row] });
        retry(&self.retry_config, || async {
            let response = self.http.post(&url).bearer_auth(&token).json(&payload).send().await?;
            check_json(response).await
        })
        .await?;
        Ok(())
    }

    async fn update_cell(&self, worksheet: &str, row: u32, col: u32, value: &str) -> AppResult<()> {
        let token = self.auth.access_token().await?;
        let range = format!("{worksheet}!{}{row}", column_letter(col));
        let url = format!("{}?valueInputOption=RAW", self.values_url(&range));
        let payload = json!({ "values": [[value]] });
        retry(&self.retry_config, || async {
            let response = self.http.put(&url).bearer_auth(&token).json(&payload).send().await?;
            check_json(response).await
        })
        .await?;
        Ok(())
    }

    /// Resolves the numeric sheet id of a worksheet, caching the answer.
    async fn sheet_id(&self, worksheet: &str) -> AppResult<i64> {
        {
            let ids = self.sheet_ids.lock().await;
            if let Some(id) = ids.get(worksheet) {
                return Ok(*id);
            }
        }

        let token = self.auth.access_token().await?;
        let url = format!(
            "{}/v4/spreadsheets/{}?fields=sheets.properties",
            self.base_url, self.spreadsheet_id
        );
        let body = retry(&self.retry_config, || async {
            let response = self.http.get(&url).bearer_auth(&token).send().await?;
            check_json(response).await
        })
        .await?;

        let mut ids = self.sheet_ids.lock().await;
        if let Some(sheets) = body.get("sheets").and_then(Value::as_array) {
            for sheet in sheets {
                let props = &sheet["properties"];
                if let (Some(title), Some(id)) = (props["title"].as_str(), props["sheetId"].as_i64())
                {
                    ids.insert(title.to_string(), id);
                }
            }
        }
        ids.get(worksheet)
            .copied()
            .ok_or_else(|| AppError::Sheets(format!("worksheet {worksheet} not found")))
    }

    async fn delete_row(&self, worksheet: &str, row: u32) -> AppResult<()> {
        let sheet_id = self.sheet_id(worksheet).await?;
        let token = self.auth.access_token().await?;
        let url =
            format!("{}/v4/spreadsheets/{}:batchUpdate", self.base_url, self.spreadsheet_id);
        let payload = json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": row - 1,
                        "endIndex": row
                    }
                }
            }]
        });
        retry(&self.retry_config, || async {
            let response = self.http.post(&url).bearer_auth(&token).json(&payload).send().await?;
            check_json(response).await
        })
        .await?;
        Ok(())
    }

    /// First row whose cell in `col` equals `needle` (1-based), with
    /// its contents.
    async fn find_row(
        &self,
        worksheet: &str,
        col: u32,
        needle: &str,
    ) -> AppResult<Option<(u32, Vec<String>)>> {
        let rows = self.read_rows(worksheet).await?;
        let idx = (col - 1) as usize;
        for (i, row) in rows.iter().enumerate() {
            if row.get(idx).map(|c| c.trim()) == Some(needle) {
                return Ok(Some((i as u32 + 1, row.clone())));
            }
        }
        Ok(None)
    }

    // ── users worksheet ─────────────────────────────────────────────

    /// All staff (skips the header row and malformed rows).
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = self.read_rows(USERS_WORKSHEET).await?;
        Ok(rows.iter().skip(1).filter_map(|row| User::from_row(row)).collect())
    }

    pub async fn add_user(&self, user: &User) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        self.append_row(USERS_WORKSHEET, &user.to_row()).await
    }

    /// Removes the user row. Returns `false` when the id is not present.
    pub async fn delete_user(&self, telegram_id: i64) -> AppResult<bool> {
        let _guard = self.write_lock.lock().await;
        match self.find_row(USERS_WORKSHEET, user_col::ID, &telegram_id.to_string()).await? {
            Some((row, _)) => {
                self.delete_row(USERS_WORKSHEET, row).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn update_user_name(&self, telegram_id: i64, name: &str) -> AppResult<bool> {
        let _guard = self.write_lock.lock().await;
        match self.find_row(USERS_WORKSHEET, user_col::ID, &telegram_id.to_string()).await? {
            Some((row, _)) => {
                self.update_cell(USERS_WORKSHEET, row, user_col::NAME, name).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ── requests worksheet ──────────────────────────────────────────

    pub async fn create_request(&self, request: &MaintenanceRequest) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        self.append_row(REQUESTS_WORKSHEET, &request.to_row()).await
    }

    /// Flips a draft row to `new` and fills in the photo link.
    pub async fn finalize_request_photo(&self, uuid: &str, photo_url: &str) -> AppResult<bool> {
        let _guard = self.write_lock.lock().await;
        let Some((row, _)) = self.find_row(REQUESTS_WORKSHEET, req_col::UUID, uuid).await? else {
            return Ok(false);
        };
        self.update_cell(REQUESTS_WORKSHEET, row, req_col::STATUS, &RequestStatus::New.to_string())
            .await?;
        self.update_cell(REQUESTS_WORKSHEET, row, req_col::PHOTO_URL, photo_url).await?;
        Ok(true)
    }

    /// Rollback for a failed transactional create.
    pub async fn delete_request(&self, uuid: &str) -> AppResult<bool> {
        let _guard = self.write_lock.lock().await;
        match self.find_row(REQUESTS_WORKSHEET, req_col::UUID, uuid).await? {
            Some((row, _)) => {
                self.delete_row(REQUESTS_WORKSHEET, row).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Assigns the request. Succeeds only from status `new`.
    pub async fn accept_request(
        &self,
        uuid: &str,
        assignee_id: i64,
        assignee_name: &str,
    ) -> AppResult<bool> {
        let _guard = self.write_lock.lock().await;
        let Some((row, cells)) = self.find_row(REQUESTS_WORKSHEET, req_col::UUID, uuid).await?
        else {
            return Ok(false);
        };
        if cell(&cells, req_col::STATUS) != RequestStatus::New.to_string() {
            return Ok(false);
        }
        self.update_cell(
            REQUESTS_WORKSHEET,
            row,
            req_col::STATUS,
            &RequestStatus::InProgress.to_string(),
        )
        .await?;
        self.update_cell(REQUESTS_WORKSHEET, row, req_col::ASSIGNEE_ID, &assignee_id.to_string())
            .await?;
        self.update_cell(REQUESTS_WORKSHEET, row, req_col::ASSIGNEE_NAME, assignee_name).await?;
        self.update_cell(REQUESTS_WORKSHEET, row, req_col::ACCEPTED_AT, &rfc3339(Some(Utc::now())))
            .await?;
        Ok(true)
    }

    /// Closes the request. Only the assignee can complete, and only
    /// from `in_progress`.
    pub async fn complete_request(&self, uuid: &str, user_id: i64) -> AppResult<bool> {
        let _guard = self.write_lock.lock().await;
        let Some((row, cells)) = self.find_row(REQUESTS_WORKSHEET, req_col::UUID, uuid).await?
        else {
            return Ok(false);
        };
        if cell(&cells, req_col::STATUS) != RequestStatus::InProgress.to_string() {
            return Ok(false);
        }
        if cell(&cells, req_col::ASSIGNEE_ID) != user_id.to_string() {
            return Ok(false);
        }
        self.update_cell(
            REQUESTS_WORKSHEET,
            row,
            req_col::STATUS,
            &RequestStatus::Completed.to_string(),
        )
        .await?;
        self.update_cell(
            REQUESTS_WORKSHEET,
            row,
            req_col::COMPLETED_AT,
            &rfc3339(Some(Utc::now())),
        )
        .await?;
        Ok(true)
    }
}

fn cell(cells: &[String], col: u32) -> &str {
    cells.get((col - 1) as usize).map(String::as_str).unwrap_or("").trim()
}

fn row_to_strings(row: &Value) -> Vec<String> {
    row.as_array()
        .map(|cells| cells.iter().map(cell_to_string).collect())
        .unwrap_or_default()
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 1 -> A, 26 -> Z, 27 -> AA.
fn column_letter(col: u32) -> String {
    let mut col = col;
    let mut letters = Vec::new();
    while col > 0 {
        letters.push(b'A' + ((col - 1) % 26) as u8);
        col = (col - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}
