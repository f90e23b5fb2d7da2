/*
[INPUT]:  A source file (path or in-memory bytes)
[OUTPUT]: Opaque task identifier assigned by the intake service
[POS]:    HTTP layer - job intake endpoint
[UPDATE]: When the upload endpoint or multipart schema changes
*/

use crate::http::{Result, VidraClient, VidraError};
use crate::types::{TaskId, UploadResponse};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use tracing::info;

/// Read a file from disk and derive the multipart file name.
pub(crate) async fn read_file_for_upload(path: &Path) -> Result<(String, Vec<u8>)> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| VidraError::upload_failed(format!("read {}: {err}", path.display())))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload.bin")
        .to_string();
    Ok((file_name, bytes))
}

impl VidraClient {
    /// Submit a file from disk for processing.
    ///
    /// POST /api/upload (multipart, single `file` field)
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> Result<TaskId> {
        let (file_name, bytes) = read_file_for_upload(path.as_ref()).await?;
        self.upload_bytes(&file_name, bytes).await
    }

    /// Submit an in-memory file for processing.
    ///
    /// POST /api/upload (multipart, single `file` field)
    ///
    /// Any non-2xx response or transport failure surfaces as
    /// `VidraError::UploadFailed`; resubmission is left to the caller.
    pub async fn upload_bytes(&self, file_name: &str, bytes: Vec<u8>) -> Result<TaskId> {
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new().part("file", part);
        let builder = self.request(Method::POST, "/api/upload")?.multipart(form);

        let response: UploadResponse = self
            .send_json(builder)
            .await
            .map_err(|err| VidraError::upload_failed(err.to_string()))?;

        info!(task_id = %response.task_id, file_name, "upload accepted");
        Ok(response.task_id)
    }
}
