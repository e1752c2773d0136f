//! Persisting new requests, transactionally when a photo is attached.

use crate::core::error::{AppError, AppResult};
use crate::google::drive::DriveClient;
use crate::google::sheets::SheetsClient;
use crate::models::request::{MaintenanceRequest, RequestStatus};

/// Writes a request that has no photo. A single append, status `new`.
pub async fn store(sheets: &SheetsClient, request: &mut MaintenanceRequest) -> AppResult<()> {
    request.status = RequestStatus::New;
    sheets.create_request(request).await
}

/// Transactional write for a request with a photo: a draft row goes in
/// first, the upload fills it in, and any failure removes the draft
/// again before the error is returned.
pub async fn store_with_photo(
    sheets: &SheetsClient,
    drive: &DriveClient,
    request: &mut MaintenanceRequest,
    photo: &[u8],
) -> AppResult<()> {
    request.status = RequestStatus::Creating;
    sheets.create_request(request).await?;

    let uuid = request.request_uuid.to_string();
    let finalized = async {
        let url = drive.upload_photo(&format!("request_{uuid}.jpg"), photo).await?;
        if !sheets.finalize_request_photo(&uuid, &url).await? {
            return Err(AppError::Sheets(format!("draft row for {uuid} disappeared")));
        }
        Ok(url)
    }
    .await;

    match finalized {
        Ok(url) => {
            request.photo_before_url = Some(url);
            request.status = RequestStatus::New;
            Ok(())
        }
        Err(err) => {
            log::error!("request {uuid} failed: {err}, rolling back draft row");
            if let Err(rollback_err) = sheets.delete_request(&uuid).await {
                log::error!("rollback of request {uuid} failed: {rollback_err}");
            }
            Err(err)
        }
    }
}
