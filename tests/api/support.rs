// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared fixtures for the HTTP tests: deterministic predictors, app state
//! builders and hand-assembled multipart bodies.

#![allow(dead_code)]

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Method, Request},
};
use guava_vision::{
    api::http_server::AppState,
    config::{TensorLayout, DEFAULT_CLASS_NAMES, DEFAULT_CORS_ORIGINS},
    vision::{
        AnalysisOptions, ClassificationPredictor, DetectionPredictor, ModelState,
        PixelBox, PixelDetection, PixelInstance, PixelPoint, SegmentationPredictor,
        VisionModelManager,
    },
};
use image::{DynamicImage, ImageFormat};
use ndarray::Array4;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

pub const BOUNDARY: &str = "guava-test-boundary";
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Classifier returning fixed scores for a 224x224 NHWC input
pub struct FakeClassifier {
    pub scores: Vec<f32>,
}

impl ClassificationPredictor for FakeClassifier {
    fn input_size(&self) -> u32 {
        224
    }

    fn layout(&self) -> TensorLayout {
        TensorLayout::Nhwc
    }

    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        anyhow::ensure!(
            input.shape() == [1, 224, 224, 3],
            "unexpected input shape {:?}",
            input.shape()
        );
        Ok(self.scores.clone())
    }
}

/// Detector returning fixed pixel boxes and recording the threshold it was given
pub struct FakeDetector {
    pub detections: Vec<PixelDetection>,
    pub seen_confidence: Mutex<Option<f32>>,
}

impl DetectionPredictor for FakeDetector {
    fn predict(&self, _image: &DynamicImage, confidence: f32) -> Result<Vec<PixelDetection>> {
        if let Ok(mut seen) = self.seen_confidence.lock() {
            *seen = Some(confidence);
        }
        Ok(self.detections.clone())
    }
}

/// Segmenter returning fixed pixel instances
pub struct FakeSegmenter {
    pub instances: Vec<PixelInstance>,
}

impl SegmentationPredictor for FakeSegmenter {
    fn predict(&self, _image: &DynamicImage, _confidence: f32) -> Result<Vec<PixelInstance>> {
        Ok(self.instances.clone())
    }
}

pub fn default_scores() -> Vec<f32> {
    vec![0.05, 0.1, 0.7, 0.1, 0.05]
}

/// One leaf at pixel box [100, 50, 300, 250]
pub fn leaf_detector() -> Arc<FakeDetector> {
    Arc::new(FakeDetector {
        detections: vec![PixelDetection {
            label: "leaf".to_string(),
            class_id: 0,
            confidence: 0.9,
            bbox: PixelBox::new(100.0, 50.0, 300.0, 250.0),
        }],
        seen_confidence: Mutex::new(None),
    })
}

/// One instance whose outline partly leaves a 640x480 frame
pub fn spot_segmenter() -> Arc<FakeSegmenter> {
    Arc::new(FakeSegmenter {
        instances: vec![PixelInstance {
            label: "rust spot".to_string(),
            class_id: 1,
            confidence: 0.8,
            bbox: PixelBox::new(320.0, 240.0, 700.0, 500.0),
            polygon: Some(vec![
                PixelPoint::new(320.0, 240.0),
                PixelPoint::new(700.0, 240.0),
                PixelPoint::new(700.0, 500.0),
                PixelPoint::new(320.0, 500.0),
            ]),
        }],
    })
}

pub fn loaded_classifier(scores: Vec<f32>) -> ModelState<dyn ClassificationPredictor> {
    ModelState::loaded(
        Arc::new(FakeClassifier { scores }) as Arc<dyn ClassificationPredictor>,
        "resnet50_densenet121_fusion.onnx",
    )
}

pub fn loaded_detector(detector: Arc<FakeDetector>) -> ModelState<dyn DetectionPredictor> {
    ModelState::loaded(detector as Arc<dyn DetectionPredictor>, "best.onnx")
}

pub fn loaded_segmenter(segmenter: Arc<FakeSegmenter>) -> ModelState<dyn SegmentationPredictor> {
    ModelState::loaded(segmenter as Arc<dyn SegmentationPredictor>, "yolov8s-seg.onnx")
}

pub fn class_names() -> Vec<String> {
    DEFAULT_CLASS_NAMES.iter().map(|s| s.to_string()).collect()
}

pub fn state_with(
    classifier: ModelState<dyn ClassificationPredictor>,
    detector: ModelState<dyn DetectionPredictor>,
    segmenter: ModelState<dyn SegmentationPredictor>,
) -> AppState {
    AppState {
        models: Arc::new(VisionModelManager::from_states(
            classifier,
            detector,
            segmenter,
            class_names(),
        )),
        options: AnalysisOptions::default(),
        max_upload_bytes: MAX_UPLOAD_BYTES,
        cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
    }
}

/// All three models loaded with the fixtures above
pub fn full_state() -> AppState {
    state_with(
        loaded_classifier(default_scores()),
        loaded_detector(leaf_detector()),
        loaded_segmenter(spot_segmenter()),
    )
}

pub fn encode_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut buffer, format)
        .expect("encode test image");
    buffer.into_inner()
}

/// Single-part multipart body
pub fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn analyze_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn upload_request(content_type: &str, data: &[u8]) -> Request<Body> {
    analyze_request(multipart_body("file", "upload.bin", content_type, data))
}

pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
