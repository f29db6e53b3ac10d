// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Disease-region detection model (YOLOv8)
//!
//! Runs on the original upload (letterboxed internally) and reports boxes in
//! original-image pixels.

use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, GenericImageView};
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use super::geometry::{ImageSize, PixelBox};
use super::preprocessing::preprocess_for_yolo;
use super::session::{build_session, first_input_name, read_class_names};
use super::yolo::{
    anchor_count, decode_candidates, label_for, non_max_suppression, predictions_matrix,
    to_original_box, MAX_DETECTIONS,
};

/// A detected region in original-image pixels
#[derive(Debug, Clone, PartialEq)]
pub struct PixelDetection {
    pub label: String,
    pub class_id: usize,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    pub bbox: PixelBox,
}

/// Black-box detection predictor
#[cfg_attr(test, mockall::automock)]
pub trait DetectionPredictor: Send + Sync {
    /// Detect regions scoring at least `confidence`
    fn predict(&self, image: &DynamicImage, confidence: f32) -> Result<Vec<PixelDetection>>;
}

/// YOLOv8 ONNX detection model
pub struct YoloDetector {
    session: Mutex<Session>,
    input_name: String,
    class_names: Vec<String>,
    input_size: u32,
    iou_threshold: f32,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("input_name", &self.input_name)
            .field("class_names", &self.class_names)
            .field("input_size", &self.input_size)
            .field("iou_threshold", &self.iou_threshold)
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load a YOLOv8 detection export
    pub async fn new<P: AsRef<Path>>(model_path: P, input_size: u32, iou_threshold: f32) -> Result<Self> {
        let model_path = model_path.as_ref();
        info!("Loading detection model from {}", model_path.display());

        let session = build_session(model_path)?;
        let input_name = first_input_name(&session, "images");
        let class_names = read_class_names(&session).unwrap_or_default();
        debug!(
            "Detection model loaded - input: {}, classes: {:?}",
            input_name, class_names
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            class_names,
            input_size,
            iou_threshold,
        })
    }
}

impl DetectionPredictor for YoloDetector {
    fn predict(&self, image: &DynamicImage, confidence: f32) -> Result<Vec<PixelDetection>> {
        let (width, height) = image.dimensions();
        let size = ImageSize::new(width, height);
        let (tensor, letterbox) = preprocess_for_yolo(image, self.input_size);
        let input_value = Value::from_array(tensor).context("Failed to create input tensor")?;

        let raw = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow!("Detection session lock poisoned"))?;
            let outputs = session
                .run(ort::inputs![&self.input_name => input_value])
                .context("Detection inference failed")?;
            let output = outputs[0]
                .try_extract_array::<f32>()
                .context("Failed to extract output tensor")?
                .to_owned();
            output
        };

        let predictions = predictions_matrix(raw, Some(anchor_count(self.input_size)))?;
        let num_classes = predictions.nrows().saturating_sub(4);
        let candidates = decode_candidates(predictions.view(), num_classes, confidence);
        let kept = non_max_suppression(candidates, self.iou_threshold, MAX_DETECTIONS);

        debug!("Detection kept {} boxes", kept.len());

        Ok(kept
            .into_iter()
            .map(|candidate| PixelDetection {
                label: label_for(&self.class_names, candidate.class_id),
                class_id: candidate.class_id,
                confidence: candidate.confidence,
                bbox: to_original_box(&candidate.bbox, &letterbox, size),
            })
            .collect())
    }
}
