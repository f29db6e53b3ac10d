// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision model manager for the classification, detection and segmentation models

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{TensorLayout, DEFAULT_CLASS_NAMES};
use crate::vision::classification::{ClassificationPredictor, OnnxClassifier};
use crate::vision::detection::{DetectionPredictor, YoloDetector};
use crate::vision::segmentation::{SegmentationPredictor, YoloSegmenter};

/// Configuration for loading vision models
#[derive(Debug, Clone)]
pub struct VisionModelConfig {
    /// Path to the classification ONNX file (optional)
    pub classification_model_path: Option<PathBuf>,
    /// Path to the detection ONNX file (optional)
    pub detection_model_path: Option<PathBuf>,
    /// Path to the segmentation ONNX file (optional)
    pub segmentation_model_path: Option<PathBuf>,
    pub classification_input_size: u32,
    pub classification_layout: TensorLayout,
    pub yolo_input_size: u32,
    pub iou_threshold: f32,
    /// Classifier labels, index-aligned with its output
    pub class_names: Vec<String>,
}

impl Default for VisionModelConfig {
    fn default() -> Self {
        Self {
            classification_model_path: Some(PathBuf::from(
                "./models/resnet50_densenet121_fusion.onnx",
            )),
            detection_model_path: Some(PathBuf::from("./models/best.onnx")),
            segmentation_model_path: Some(PathBuf::from("./models/yolov8s-seg.onnx")),
            classification_input_size: 224,
            classification_layout: TensorLayout::Nhwc,
            yolo_input_size: 640,
            iou_threshold: 0.7,
            class_names: DEFAULT_CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Load outcome of a single model
pub enum ModelState<T: ?Sized> {
    Loaded {
        model: Arc<T>,
        /// Reported in `models_used` (the model file name)
        identifier: String,
    },
    Unloaded {
        reason: String,
    },
}

impl<T: ?Sized> ModelState<T> {
    pub fn loaded(model: Arc<T>, identifier: impl Into<String>) -> Self {
        Self::Loaded {
            model,
            identifier: identifier.into(),
        }
    }

    pub fn unloaded(reason: impl Into<String>) -> Self {
        Self::Unloaded {
            reason: reason.into(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }

    pub fn model(&self) -> Option<Arc<T>> {
        match self {
            Self::Loaded { model, .. } => Some(Arc::clone(model)),
            Self::Unloaded { .. } => None,
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::Loaded { identifier, .. } => Some(identifier),
            Self::Unloaded { .. } => None,
        }
    }

    /// Why the model is unavailable
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Loaded { .. } => None,
            Self::Unloaded { reason } => Some(reason),
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for ModelState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded { identifier, .. } => {
                f.debug_struct("Loaded").field("identifier", identifier).finish()
            }
            Self::Unloaded { reason } => f.debug_struct("Unloaded").field("reason", reason).finish(),
        }
    }
}

/// Per-model availability, as reported by `/health`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelAvailability {
    pub classification: bool,
    pub detection: bool,
    pub segmentation: bool,
}

/// Information about a configured vision model
#[derive(Debug, Clone)]
pub struct VisionModelInfo {
    /// Model identifier, if loaded
    pub name: Option<String>,
    /// Model type (classification, detection, segmentation)
    pub model_type: String,
    /// Whether the model is available
    pub available: bool,
}

/// Manager for the three vision models
///
/// Each model loads independently. A model that fails to load is kept as
/// `Unloaded` with its reason and never prevents the service from starting.
/// The manager is read-only after construction and shared across requests.
pub struct VisionModelManager {
    classifier: ModelState<dyn ClassificationPredictor>,
    detector: ModelState<dyn DetectionPredictor>,
    segmenter: ModelState<dyn SegmentationPredictor>,
    class_names: Vec<String>,
}

impl VisionModelManager {
    /// Load every configured model. Missing or broken models are logged and
    /// recorded as unloaded.
    pub async fn new(config: VisionModelConfig) -> Self {
        let classifier = match config.classification_model_path {
            Some(ref path) => settle(
                "classification",
                path,
                OnnxClassifier::new(
                    path,
                    config.classification_input_size,
                    config.classification_layout,
                )
                .await
                .map(|model| Arc::new(model) as Arc<dyn ClassificationPredictor>),
            ),
            None => ModelState::unloaded("no classification model configured"),
        };

        let detector = match config.detection_model_path {
            Some(ref path) => settle(
                "detection",
                path,
                YoloDetector::new(path, config.yolo_input_size, config.iou_threshold)
                    .await
                    .map(|model| Arc::new(model) as Arc<dyn DetectionPredictor>),
            ),
            None => ModelState::unloaded("no detection model configured"),
        };

        let segmenter = match config.segmentation_model_path {
            Some(ref path) => settle(
                "segmentation",
                path,
                YoloSegmenter::new(path, config.yolo_input_size, config.iou_threshold)
                    .await
                    .map(|model| Arc::new(model) as Arc<dyn SegmentationPredictor>),
            ),
            None => ModelState::unloaded("no segmentation model configured"),
        };

        Self {
            classifier,
            detector,
            segmenter,
            class_names: config.class_names,
        }
    }

    /// Assemble a manager from already-resolved model states
    pub fn from_states(
        classifier: ModelState<dyn ClassificationPredictor>,
        detector: ModelState<dyn DetectionPredictor>,
        segmenter: ModelState<dyn SegmentationPredictor>,
        class_names: Vec<String>,
    ) -> Self {
        Self {
            classifier,
            detector,
            segmenter,
            class_names,
        }
    }

    /// Get the classifier if available
    pub fn get_classifier(&self) -> Option<Arc<dyn ClassificationPredictor>> {
        self.classifier.model()
    }

    /// Get the detector if available
    pub fn get_detector(&self) -> Option<Arc<dyn DetectionPredictor>> {
        self.detector.model()
    }

    /// Get the segmenter if available
    pub fn get_segmenter(&self) -> Option<Arc<dyn SegmentationPredictor>> {
        self.segmenter.model()
    }

    pub fn classifier_state(&self) -> &ModelState<dyn ClassificationPredictor> {
        &self.classifier
    }

    pub fn detector_state(&self) -> &ModelState<dyn DetectionPredictor> {
        &self.detector
    }

    pub fn segmenter_state(&self) -> &ModelState<dyn SegmentationPredictor> {
        &self.segmenter
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_loaded()
    }

    pub fn has_detector(&self) -> bool {
        self.detector.is_loaded()
    }

    pub fn has_segmenter(&self) -> bool {
        self.segmenter.is_loaded()
    }

    /// Configured classifier labels
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn availability(&self) -> ModelAvailability {
        ModelAvailability {
            classification: self.has_classifier(),
            detection: self.has_detector(),
            segmentation: self.has_segmenter(),
        }
    }

    /// List all vision models and whether they loaded
    pub fn list_models(&self) -> Vec<VisionModelInfo> {
        vec![
            VisionModelInfo {
                name: self.classifier.identifier().map(str::to_string),
                model_type: "classification".to_string(),
                available: self.has_classifier(),
            },
            VisionModelInfo {
                name: self.detector.identifier().map(str::to_string),
                model_type: "detection".to_string(),
                available: self.has_detector(),
            },
            VisionModelInfo {
                name: self.segmenter.identifier().map(str::to_string),
                model_type: "segmentation".to_string(),
                available: self.has_segmenter(),
            },
        ]
    }

    /// Log one status line per model
    pub fn log_status(&self) {
        log_state("Classification", &self.classifier);
        log_state("Detection", &self.detector);
        log_state("Segmentation", &self.segmenter);
    }
}

/// Turn a load result into a model state, logging the outcome
fn settle<T: ?Sized>(kind: &str, path: &Path, result: anyhow::Result<Arc<T>>) -> ModelState<T> {
    match result {
        Ok(model) => {
            tracing::info!("✅ {} model loaded from {}", kind, path.display());
            ModelState::loaded(model, model_identifier(path))
        }
        Err(e) => {
            tracing::warn!(
                "⚠️ Failed to load {} model from {}: {:#}",
                kind,
                path.display(),
                e
            );
            ModelState::unloaded(format!("{:#}", e))
        }
    }
}

/// Identifier reported for a model file
pub fn model_identifier(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn log_state<T: ?Sized>(kind: &str, state: &ModelState<T>) {
    match state {
        ModelState::Loaded { identifier, .. } => {
            tracing::info!("   {:<15} LOADED ({})", kind, identifier)
        }
        ModelState::Unloaded { reason } => {
            tracing::warn!("   {:<15} NOT LOADED ({})", kind, reason)
        }
    }
}
