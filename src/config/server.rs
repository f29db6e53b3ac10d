// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server configuration from command-line flags and environment variables

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::vision::VisionModelConfig;

/// Default label set of the guava leaf/fruit classifier
pub const DEFAULT_CLASS_NAMES: &[&str] = &["Healthy", "Phytopthora", "Red rust", "Scab", "Styler and Root"];

/// Development origins allowed by default (Vite dev server)
pub const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:5173", "http://127.0.0.1:5173"];

/// Largest YOLOv8 head stride; input sizes must divide evenly by it
const YOLO_MAX_STRIDE: u32 = 32;

/// Default maximum upload size (10MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Memory layout of the classification input tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TensorLayout {
    /// [1, H, W, 3] - Keras/TensorFlow exports
    Nhwc,
    /// [1, 3, H, W] - PyTorch exports
    Nchw,
}

/// GuavaVision server configuration
///
/// Every flag can also be provided through the environment (a `.env` file is
/// honoured). Model file names are resolved against `models_dir`.
#[derive(Parser, Debug, Clone)]
#[command(name = "guava-vision", version, about = "Guava disease diagnosis API server")]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "GUAVA_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "GUAVA_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Directory holding the model artifacts
    #[arg(long, env = "GUAVA_MODELS_DIR", default_value = "models")]
    pub models_dir: PathBuf,

    /// Classification model file (ResNet50 + DenseNet121 fusion, ONNX)
    #[arg(
        long,
        env = "GUAVA_CLASSIFICATION_MODEL",
        default_value = "resnet50_densenet121_fusion.onnx"
    )]
    pub classification_model: String,

    /// Detection model file (YOLOv8, ONNX)
    #[arg(long, env = "GUAVA_DETECTION_MODEL", default_value = "best.onnx")]
    pub detection_model: String,

    /// Segmentation model file (YOLOv8-seg, ONNX)
    #[arg(long, env = "GUAVA_SEGMENTATION_MODEL", default_value = "yolov8s-seg.onnx")]
    pub segmentation_model: String,

    /// Square input size of the classification model
    #[arg(long, env = "GUAVA_CLASSIFICATION_INPUT_SIZE", default_value_t = 224)]
    pub classification_input_size: u32,

    /// Tensor layout expected by the classification model
    #[arg(long, env = "GUAVA_CLASSIFICATION_LAYOUT", value_enum, default_value = "nhwc")]
    pub classification_layout: TensorLayout,

    /// Square input size of the YOLO models
    #[arg(long, env = "GUAVA_YOLO_INPUT_SIZE", default_value_t = 640)]
    pub yolo_input_size: u32,

    /// Minimum confidence for detections and segmentations
    #[arg(long, env = "GUAVA_CONFIDENCE_THRESHOLD", default_value_t = 0.25)]
    pub confidence_threshold: f32,

    /// IoU threshold for non-maximum suppression
    #[arg(long, env = "GUAVA_IOU_THRESHOLD", default_value_t = 0.7)]
    pub iou_threshold: f32,

    /// Comma-separated classifier label set, in model output order
    #[arg(
        long,
        env = "GUAVA_CLASS_NAMES",
        value_delimiter = ',',
        default_values_t = DEFAULT_CLASS_NAMES.iter().map(|s| s.to_string()).collect::<Vec<_>>()
    )]
    pub class_names: Vec<String>,

    /// Comma-separated list of origins allowed by CORS
    #[arg(
        long,
        env = "GUAVA_CORS_ORIGINS",
        value_delimiter = ',',
        default_values_t = DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect::<Vec<_>>()
    )]
    pub cors_origins: Vec<String>,

    /// Maximum accepted upload size in bytes
    #[arg(long, env = "GUAVA_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            models_dir: PathBuf::from("models"),
            classification_model: "resnet50_densenet121_fusion.onnx".to_string(),
            detection_model: "best.onnx".to_string(),
            segmentation_model: "yolov8s-seg.onnx".to_string(),
            classification_input_size: 224,
            classification_layout: TensorLayout::Nhwc,
            yolo_input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            class_names: DEFAULT_CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// Validate value ranges; missing model files are not a configuration error
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            bail!(
                "Confidence threshold must be in [0.0, 1.0], got {}",
                self.confidence_threshold
            );
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            bail!("IoU threshold must be in [0.0, 1.0], got {}", self.iou_threshold);
        }
        if self.classification_input_size == 0 {
            bail!("Classification input size must be > 0");
        }
        if self.yolo_input_size < YOLO_MAX_STRIDE || self.yolo_input_size % YOLO_MAX_STRIDE != 0 {
            bail!(
                "YOLO input size must be a positive multiple of {}, got {}",
                YOLO_MAX_STRIDE,
                self.yolo_input_size
            );
        }
        if self.class_names.is_empty() {
            bail!("At least one class name is required");
        }
        if let Some(index) = self.class_names.iter().position(|name| name.trim().is_empty()) {
            bail!("Class name at position {} is blank", index);
        }
        if self.max_upload_bytes == 0 {
            bail!("Maximum upload size must be > 0");
        }
        Ok(())
    }

    /// Socket address to bind the HTTP server on
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        Ok(addr.parse::<SocketAddr>()?)
    }

    /// Build the model loader configuration
    pub fn vision_config(&self) -> VisionModelConfig {
        VisionModelConfig {
            classification_model_path: Some(self.models_dir.join(&self.classification_model)),
            detection_model_path: Some(self.models_dir.join(&self.detection_model)),
            segmentation_model_path: Some(self.models_dir.join(&self.segmentation_model)),
            classification_input_size: self.classification_input_size,
            classification_layout: self.classification_layout,
            yolo_input_size: self.yolo_input_size,
            iou_threshold: self.iou_threshold,
            class_names: self
                .class_names
                .iter()
                .map(|name| name.trim().to_string())
                .collect(),
        }
    }
}
