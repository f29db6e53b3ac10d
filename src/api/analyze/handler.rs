// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analyze endpoint handler

use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use tracing::{debug, error, warn};

use super::request::read_image_upload;
use super::response::AnalyzeResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::{analyze, decode_image_bytes};

/// POST /analyze - Diagnose an uploaded image
///
/// Accepts a multipart form with the image in the `file` field and returns the
/// classification, detected regions and segmented instances.
///
/// # Response
/// - `classification`: predicted label, confidence, full probability list, model
/// - `detections`: `{label, confidence, bbox}` with bbox as `[x, y, w, h]` percentages
/// - `segmentations`: detections plus `mask_points` percentages
/// - `models_used`: identifiers of the models that ran (null when not loaded)
/// - `image`: original width and height in pixels
/// - `processing_time_ms`: time spent in the models
///
/// # Errors
/// - 400 Bad Request: non-image content type, empty upload, undecodable image
/// - 413 Payload Too Large: upload exceeds the configured maximum
/// - 503 Service Unavailable: classification model not loaded
/// - 500 Internal Server Error: a model failed during inference
pub async fn analyze_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    // 1. Extract and validate the upload
    let upload = read_image_upload(&mut multipart, state.max_upload_bytes)
        .await
        .map_err(|e| {
            warn!("Analyze upload rejected: {}", e);
            e
        })?;
    upload.validate().map_err(|e| {
        warn!("Analyze upload rejected: {}", e);
        e
    })?;

    // 2. Decode to RGB
    let (image, image_info) =
        decode_image_bytes(&upload.data, state.max_upload_bytes).map_err(|e| {
            warn!("Failed to decode image {:?}: {}", upload.file_name, e);
            ApiError::from(e)
        })?;

    debug!(
        "Decoded image: {}x{}, {:?}, {} bytes",
        image_info.width, image_info.height, image_info.format, image_info.size_bytes
    );

    // 3. Run the models off the async runtime
    let models = state.models.clone();
    let options = state.options;
    let report = tokio::task::spawn_blocking(move || analyze(&models, &image, &options))
        .await
        .map_err(|e| {
            error!("Analysis task failed: {}", e);
            ApiError::InternalError("Analysis task failed".to_string())
        })?
        .map_err(|e| {
            warn!("Analysis failed: {}", e);
            ApiError::from(e)
        })?;

    Ok(Json(AnalyzeResponse::from(report)))
}
