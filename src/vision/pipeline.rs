// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analysis pipeline: classify, detect, segment, then normalize to percentages
//!
//! Stages run in a fixed order and never feed each other. Classification is
//! mandatory; detection and segmentation degrade to empty lists when their
//! model is not loaded.

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

use super::classification::{argmax, resolve_labels};
use super::geometry::ImageSize;
use super::model_manager::VisionModelManager;
use super::preprocessing::preprocess_for_classification;

/// Default detection/segmentation confidence threshold
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Per-request analysis options
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    pub confidence_threshold: f32,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Analysis failure
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Classification model not loaded")]
    ClassifierUnavailable,

    #[error("{stage} inference failed: {message}")]
    Inference { stage: &'static str, message: String },
}

impl AnalysisError {
    fn inference(stage: &'static str, error: anyhow::Error) -> Self {
        Self::Inference {
            stage,
            message: format!("{:#}", error),
        }
    }
}

/// Classification result with the full labelled distribution
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationOutcome {
    pub predicted: String,
    pub confidence: f32,
    /// `(label, score)` for every class, in model output order
    pub probabilities: Vec<(String, f32)>,
    /// Identifier of the classifier that produced this result
    pub model: String,
}

/// Detection with its box as `[x, y, width, height]` percentages
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDetection {
    pub label: String,
    pub confidence: f32,
    pub bbox: [f32; 4],
}

/// Segmented instance with percentage box and outline
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedInstance {
    pub label: String,
    pub confidence: f32,
    pub bbox: [f32; 4],
    /// Outline points as `(x, y)` percentages
    pub mask_points: Vec<(f32, f32)>,
}

/// Identifiers of the models that took part in an analysis (null = not loaded)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelsUsed {
    pub classification: String,
    pub detection: Option<String>,
    pub segmentation: Option<String>,
}

/// Everything produced for one uploaded image
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub image: ImageSize,
    pub classification: ClassificationOutcome,
    pub detections: Vec<NormalizedDetection>,
    pub segmentations: Vec<NormalizedInstance>,
    pub models_used: ModelsUsed,
    pub processing_time_ms: u64,
}

/// Run every available model on `image`.
///
/// Blocking; call from `spawn_blocking` in async contexts.
pub fn analyze(
    models: &VisionModelManager,
    image: &DynamicImage,
    options: &AnalysisOptions,
) -> Result<AnalysisReport, AnalysisError> {
    let start = Instant::now();
    let (width, height) = image.dimensions();
    let size = ImageSize::new(width, height);

    let classifier = models
        .get_classifier()
        .ok_or(AnalysisError::ClassifierUnavailable)?;
    let classifier_id = models
        .classifier_state()
        .identifier()
        .unwrap_or_default()
        .to_string();

    // 1. Classification
    let input = preprocess_for_classification(image, classifier.input_size(), classifier.layout());
    let scores = classifier
        .predict(&input)
        .map_err(|e| AnalysisError::inference("Classification", e))?;
    let (best, confidence) = argmax(&scores).ok_or_else(|| AnalysisError::Inference {
        stage: "Classification",
        message: "model returned no scores".to_string(),
    })?;
    let labels = resolve_labels(models.class_names(), scores.len());
    let classification = ClassificationOutcome {
        predicted: labels[best].clone(),
        confidence,
        probabilities: labels.into_iter().zip(scores).collect(),
        model: classifier_id.clone(),
    };
    debug!(
        "Classification: {} ({:.3})",
        classification.predicted, classification.confidence
    );

    // 2. Detection
    let detections = match models.get_detector() {
        Some(detector) => detector
            .predict(image, options.confidence_threshold)
            .map_err(|e| AnalysisError::inference("Detection", e))?
            .into_iter()
            .map(|d| NormalizedDetection {
                label: d.label,
                confidence: d.confidence,
                bbox: d.bbox.to_percent(size),
            })
            .collect(),
        None => Vec::new(),
    };

    // 3. Segmentation
    let segmentations = match models.get_segmenter() {
        Some(segmenter) => segmenter
            .predict(image, options.confidence_threshold)
            .map_err(|e| AnalysisError::inference("Segmentation", e))?
            .into_iter()
            .filter_map(|instance| {
                let polygon = instance.polygon?;
                Some(NormalizedInstance {
                    label: instance.label,
                    confidence: instance.confidence,
                    bbox: instance.bbox.to_percent(size),
                    mask_points: polygon.iter().map(|p| p.to_percent(size)).collect(),
                })
            })
            .collect(),
        None => Vec::new(),
    };

    let models_used = ModelsUsed {
        classification: classifier_id,
        detection: models.detector_state().identifier().map(str::to_string),
        segmentation: models.segmenter_state().identifier().map(str::to_string),
    };

    let processing_time_ms = start.elapsed().as_millis() as u64;
    info!(
        "Analyzed {}x{} image: {} ({:.2}), {} detections, {} segmentations in {}ms",
        width,
        height,
        classification.predicted,
        classification.confidence,
        detections.len(),
        segmentations.len(),
        processing_time_ms
    );

    Ok(AnalysisReport {
        image: size,
        classification,
        detections,
        segmentations,
        models_used,
        processing_time_ms,
    })
}
