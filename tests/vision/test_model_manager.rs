// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Vision Model Manager tests
//!
//! These tests verify that the VisionModelManager:
//! - Builds its configuration from the server flags
//! - Never fails to start when model files are missing or corrupt
//! - Records why each unloaded model is unavailable
//! - Reports availability and identifiers per model

use clap::Parser;
use guava_vision::{
    config::ServerConfig,
    vision::{VisionModelConfig, VisionModelManager},
};
use std::io::Write;
use std::path::PathBuf;

#[cfg(test)]
mod model_manager_tests {
    use super::*;

    fn empty_config() -> VisionModelConfig {
        VisionModelConfig {
            classification_model_path: None,
            detection_model_path: None,
            segmentation_model_path: None,
            ..VisionModelConfig::default()
        }
    }

    // =============================================================================
    // VisionModelConfig Tests
    // =============================================================================

    /// Test 1: Default config points at the bundled model file names
    #[test]
    fn test_default_config_has_expected_paths() {
        let config = VisionModelConfig::default();

        assert!(config
            .classification_model_path
            .as_ref()
            .unwrap()
            .ends_with("resnet50_densenet121_fusion.onnx"));
        assert!(config
            .detection_model_path
            .as_ref()
            .unwrap()
            .ends_with("best.onnx"));
        assert!(config
            .segmentation_model_path
            .as_ref()
            .unwrap()
            .ends_with("yolov8s-seg.onnx"));
        assert_eq!(config.yolo_input_size, 640);
        assert_eq!(config.classification_input_size, 224);
    }

    /// Test 2: Server flags resolve model paths under the models directory
    #[test]
    fn test_config_from_server_flags() {
        let server = ServerConfig::parse_from([
            "guava-vision",
            "--models-dir",
            "/opt/guava",
            "--detection-model",
            "leaves.onnx",
            "--class-names",
            " Healthy , Scab ",
        ]);
        let config = server.vision_config();

        assert_eq!(
            config.detection_model_path,
            Some(PathBuf::from("/opt/guava/leaves.onnx"))
        );
        assert_eq!(
            config.classification_model_path,
            Some(PathBuf::from("/opt/guava/resnet50_densenet121_fusion.onnx"))
        );
        assert_eq!(config.class_names, vec!["Healthy", "Scab"]);
    }

    // =============================================================================
    // VisionModelManager Tests - Without Models
    // =============================================================================

    /// Test 3: Manager initializes with no models configured
    #[tokio::test]
    async fn test_manager_initializes_with_no_models() {
        let manager = VisionModelManager::new(empty_config()).await;

        assert!(!manager.has_classifier());
        assert!(!manager.has_detector());
        assert!(!manager.has_segmenter());
        assert!(manager.get_classifier().is_none());
    }

    /// Test 4: Missing model files do not abort startup
    #[tokio::test]
    async fn test_manager_handles_missing_files() {
        let config = VisionModelConfig {
            classification_model_path: Some(PathBuf::from("/nonexistent/cls.onnx")),
            detection_model_path: Some(PathBuf::from("/nonexistent/det.onnx")),
            segmentation_model_path: Some(PathBuf::from("/nonexistent/seg.onnx")),
            ..VisionModelConfig::default()
        };

        let manager = VisionModelManager::new(config).await;

        let availability = manager.availability();
        assert!(!availability.classification);
        assert!(!availability.detection);
        assert!(!availability.segmentation);
        assert!(manager
            .detector_state()
            .reason()
            .unwrap()
            .contains("/nonexistent/det.onnx"));
    }

    /// Test 5: A corrupt artifact only disables its own slot
    #[tokio::test]
    async fn test_corrupt_file_is_isolated() {
        let mut corrupt = tempfile::NamedTempFile::new().unwrap();
        corrupt.write_all(b"\x00\x01 definitely not protobuf").unwrap();

        let config = VisionModelConfig {
            detection_model_path: Some(corrupt.path().to_path_buf()),
            ..empty_config()
        };

        let manager = VisionModelManager::new(config).await;

        assert!(!manager.has_detector());
        assert!(manager.detector_state().reason().is_some());
        assert_eq!(
            manager.classifier_state().reason(),
            Some("no classification model configured")
        );
    }

    /// Test 6: list_models covers all three slots
    #[tokio::test]
    async fn test_list_models() {
        let manager = VisionModelManager::new(empty_config()).await;
        let models = manager.list_models();

        assert_eq!(models.len(), 3);
        let types: Vec<&str> = models.iter().map(|m| m.model_type.as_str()).collect();
        assert_eq!(types, vec!["classification", "detection", "segmentation"]);
        assert!(models.iter().all(|m| !m.available && m.name.is_none()));
    }

    /// Test 7: Configured class names are kept for the classifier
    #[tokio::test]
    async fn test_class_names_preserved() {
        let manager = VisionModelManager::new(empty_config()).await;
        assert_eq!(
            manager.class_names(),
            &["Healthy", "Phytopthora", "Red rust", "Scab", "Styler and Root"]
        );
    }
}
