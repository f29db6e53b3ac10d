// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for guava disease analysis
//!
//! This module provides:
//! - Disease classification of the whole image
//! - Disease-region detection (YOLOv8)
//! - Instance segmentation with polygon outlines (YOLOv8-seg)
//!
//! All models are ONNX artifacts run through ONNX Runtime and are optional at load time.

pub mod classification;
pub mod detection;
pub mod geometry;
pub mod image_utils;
pub mod model_manager;
pub mod pipeline;
pub mod preprocessing;
pub mod segmentation;
pub mod session;
pub mod yolo;

pub use classification::{ClassificationPredictor, OnnxClassifier};
pub use detection::{DetectionPredictor, PixelDetection, YoloDetector};
pub use geometry::{ImageSize, PixelBox, PixelPoint};
pub use image_utils::{decode_image_bytes, detect_format, is_image_content_type, ImageError, ImageInfo};
pub use model_manager::{
    ModelAvailability, ModelState, VisionModelConfig, VisionModelInfo, VisionModelManager,
};
pub use pipeline::{analyze, AnalysisError, AnalysisOptions, AnalysisReport};
pub use segmentation::{PixelInstance, SegmentationPredictor, YoloSegmenter};
