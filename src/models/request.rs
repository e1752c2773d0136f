//! Maintenance requests (the `requests` worksheet).

use chrono::{DateTime, SecondsFormat, Utc};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum RequestStatus {
    /// Draft row written before the photo upload finishes.
    Creating,
    New,
    InProgress,
    Completed,
    Cancelled,
}

/// One request as stored in the sheet; `to_row` fixes the column order.
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceRequest {
    pub request_uuid: Uuid,
    pub status: RequestStatus,
    pub location: Option<String>,
    pub issue_type: Option<String>,
    pub photo_before_url: Option<String>,
    pub reporter_id: i64,
    pub reporter_name: String,
    pub created_at: DateTime<Utc>,
    pub assignee_id: Option<i64>,
    pub assignee_name: Option<String>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Telegram file id of the "before" photo. Never written to the sheet.
    pub photo_file_id: Option<String>,
}

impl MaintenanceRequest {
    pub fn new(reporter_id: i64, reporter_name: String) -> Self {
        Self {
            request_uuid: Uuid::new_v4(),
            status: RequestStatus::New,
            location: None,
            issue_type: None,
            photo_before_url: None,
            reporter_id,
            reporter_name,
            created_at: Utc::now(),
            assignee_id: None,
            assignee_name: None,
            accepted_at: None,
            completed_at: None,
            photo_file_id: None,
        }
    }

    /// Human-friendly request number: the first 8 hex digits of the uuid.
    pub fn short_id(&self) -> String {
        self.request_uuid.to_string().chars().take(8).collect()
    }

    /// Serializes to the worksheet row. The sheet layout is positional,
    /// so this order must stay in sync with the column constants in the
    /// sheets client.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.request_uuid.to_string(),
            self.status.to_string(),
            self.location.clone().unwrap_or_default(),
            self.issue_type.clone().unwrap_or_default(),
            self.photo_before_url.clone().unwrap_or_default(),
            self.reporter_id.to_string(),
            self.reporter_name.clone(),
            rfc3339(Some(self.created_at)),
            self.assignee_id.map(|id| id.to_string()).unwrap_or_default(),
            self.assignee_name.clone().unwrap_or_default(),
            rfc3339(self.accepted_at),
            rfc3339(self.completed_at),
        ]
    }
}

pub(crate) fn rfc3339(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)).unwrap_or_default()
}
