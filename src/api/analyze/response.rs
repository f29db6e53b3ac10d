// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analyze response types
//!
//! All boxes are `[x, y, width, height]` and all points `{x, y}`, expressed as
//! percentages of the original image width/height.

use serde::{Deserialize, Serialize};

use crate::vision::pipeline::{
    AnalysisReport, ClassificationOutcome, NormalizedDetection, NormalizedInstance,
};
pub use crate::vision::pipeline::ModelsUsed;

/// Score for one class
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassProbability {
    #[serde(rename = "class")]
    pub label: String,
    pub score: f32,
}

/// Whole-image disease classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Predicted label
    pub predicted: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Every class with its score, in model output order
    pub probabilities: Vec<ClassProbability>,
    /// Classifier identifier
    pub model: String,
}

/// A detected disease region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: [f32; 4],
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MaskPoint {
    pub x: f32,
    pub y: f32,
}

/// A segmented instance with its mask outline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segmentation {
    pub label: String,
    pub confidence: f32,
    pub bbox: [f32; 4],
    pub mask_points: Vec<MaskPoint>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Response from POST /analyze
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub classification: ClassificationResult,
    pub detections: Vec<Detection>,
    pub segmentations: Vec<Segmentation>,
    pub models_used: ModelsUsed,
    /// Original image size in pixels
    pub image: ImageDimensions,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl From<ClassificationOutcome> for ClassificationResult {
    fn from(outcome: ClassificationOutcome) -> Self {
        Self {
            predicted: outcome.predicted,
            confidence: outcome.confidence,
            probabilities: outcome
                .probabilities
                .into_iter()
                .map(|(label, score)| ClassProbability { label, score })
                .collect(),
            model: outcome.model,
        }
    }
}

impl From<NormalizedDetection> for Detection {
    fn from(detection: NormalizedDetection) -> Self {
        Self {
            label: detection.label,
            confidence: detection.confidence,
            bbox: detection.bbox,
        }
    }
}

impl From<NormalizedInstance> for Segmentation {
    fn from(instance: NormalizedInstance) -> Self {
        Self {
            label: instance.label,
            confidence: instance.confidence,
            bbox: instance.bbox,
            mask_points: instance
                .mask_points
                .into_iter()
                .map(|(x, y)| MaskPoint { x, y })
                .collect(),
        }
    }
}

impl From<AnalysisReport> for AnalyzeResponse {
    fn from(report: AnalysisReport) -> Self {
        Self {
            classification: report.classification.into(),
            detections: report.detections.into_iter().map(Detection::from).collect(),
            segmentations: report
                .segmentations
                .into_iter()
                .map(Segmentation::from)
                .collect(),
            models_used: report.models_used,
            image: ImageDimensions {
                width: report.image.width,
                height: report.image.height,
            },
            processing_time_ms: report.processing_time_ms,
        }
    }
}
