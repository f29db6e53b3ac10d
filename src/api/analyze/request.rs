// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart upload extraction and validation

use axum::body::Bytes;
use axum::http::StatusCode;
use axum_extra::extract::Multipart;
use tracing::debug;

use crate::api::errors::ApiError;
use crate::vision::is_image_content_type;

/// Form field carrying the image
pub const FILE_FIELD: &str = "file";

/// The uploaded image part of a multipart form
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl ImageUpload {
    /// Check the declared content type and payload before decoding
    pub fn validate(&self) -> Result<(), ApiError> {
        if !is_image_content_type(self.content_type.as_deref()) {
            return Err(ApiError::InvalidRequest(
                "Upload must be an image file.".to_string(),
            ));
        }

        if self.data.is_empty() {
            return Err(ApiError::ValidationError {
                field: FILE_FIELD.to_string(),
                message: "Uploaded file is empty.".to_string(),
            });
        }

        Ok(())
    }
}

/// Read the `file` field from a multipart form. Other fields are ignored.
pub async fn read_image_upload(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<ImageUpload, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge { limit: max_bytes }
        } else {
            ApiError::InvalidRequest(format!("Multipart error: {}", e))
        }
    })? {
        if field.name() != Some(FILE_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::PayloadTooLarge { limit: max_bytes }
            } else {
                ApiError::InvalidRequest(format!("Failed to read upload: {}", e))
            }
        })?;

        return Ok(ImageUpload {
            file_name,
            content_type,
            data,
        });
    }

    Err(ApiError::ValidationError {
        field: FILE_FIELD.to_string(),
        message: "No file field in upload".to_string(),
    })
}
