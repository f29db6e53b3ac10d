// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analyze API endpoint module
//!
//! Provides POST /analyze for diagnosing an uploaded leaf or fruit photo.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::analyze_handler;
pub use request::{read_image_upload, ImageUpload};
pub use response::{
    AnalyzeResponse, ClassificationResult, ClassProbability, Detection, ImageDimensions,
    MaskPoint, ModelsUsed, Segmentation,
};
