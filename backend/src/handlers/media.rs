//! HTTP handler for quality test image uploads

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use shared::{validate_image_upload, MediaReference};

use crate::error::{AppError, AppResult};
use crate::external::ImageUpload;
use crate::middleware::CurrentUser;
use crate::AppState;

/// Upload a photo of a quality test reading; expects a multipart `file` field
pub async fn upload_quality_image(
    State(state): State<AppState>,
    current_user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<MediaReference>)> {
    current_user.0.require("production", "execute")?;

    while let Some(field) = multipart.next_field().await.map_err(|e| AppError::Validation {
        field: "file".to_string(),
        message: format!("Malformed upload: {}", e),
        message_th: "ข้อมูลที่อัปโหลดไม่ถูกต้อง".to_string(),
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let original_filename = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| AppError::Validation {
            field: "file".to_string(),
            message: format!("Could not read upload: {}", e),
            message_th: "ไม่สามารถอ่านไฟล์ที่อัปโหลดได้".to_string(),
        })?;

        validate_image_upload(
            content_type.as_deref(),
            bytes.len(),
            state.config.storage.max_image_bytes,
        )?;

        let reference = state
            .media
            .upload_quality_image(ImageUpload {
                bytes: bytes.to_vec(),
                content_type: content_type.unwrap_or_default(),
                original_filename,
            })
            .await?;

        return Ok((StatusCode::CREATED, Json(reference)));
    }

    Err(AppError::Validation {
        field: "file".to_string(),
        message: "No file was uploaded".to_string(),
        message_th: "ไม่พบไฟล์ที่อัปโหลด".to_string(),
    })
}
