// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Disease classification model (ResNet50 + DenseNet121 fusion)
//!
//! The predictor receives a batch-of-one tensor already resized and scaled to
//! [0, 1] and returns one probability per class.

use anyhow::{anyhow, Context, Result};
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use super::session::{build_session, first_input_name, synthetic_label};
use crate::config::TensorLayout;

/// Tolerance when deciding whether raw outputs already form a distribution
const DISTRIBUTION_TOLERANCE: f32 = 1e-3;

/// Black-box classification predictor
#[cfg_attr(test, mockall::automock)]
pub trait ClassificationPredictor: Send + Sync {
    /// Square input size expected by the model
    fn input_size(&self) -> u32;

    /// Layout of the input tensor
    fn layout(&self) -> TensorLayout;

    /// Run the model once and return per-class probabilities
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>>;
}

/// ONNX classification model
pub struct OnnxClassifier {
    /// ONNX Runtime session (run requires exclusive access)
    session: Mutex<Session>,
    /// Model input name
    input_name: String,
    input_size: u32,
    layout: TensorLayout,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("input_name", &self.input_name)
            .field("input_size", &self.input_size)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl OnnxClassifier {
    /// Load the classification model from an ONNX file
    pub async fn new<P: AsRef<Path>>(
        model_path: P,
        input_size: u32,
        layout: TensorLayout,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        info!("Loading classification model from {}", model_path.display());

        let session = build_session(model_path)?;
        let input_name = first_input_name(&session, "input_1");
        debug!(
            "Classification model loaded - input: {}, size: {}, layout: {:?}",
            input_name, input_size, layout
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            input_size,
            layout,
        })
    }
}

impl ClassificationPredictor for OnnxClassifier {
    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn layout(&self) -> TensorLayout {
        self.layout
    }

    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        let input_value =
            Value::from_array(input.to_owned()).context("Failed to create input tensor")?;

        let raw: Vec<f32> = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow!("Classification session lock poisoned"))?;
            let outputs = session
                .run(ort::inputs![&self.input_name => input_value])
                .context("Classification inference failed")?;
            let output = outputs[0]
                .try_extract_array::<f32>()
                .context("Failed to extract output tensor")?;
            let scores: Vec<f32> = output.iter().copied().collect();
            scores
        };

        if raw.is_empty() {
            anyhow::bail!("Classification model returned an empty output");
        }

        Ok(to_probabilities(raw))
    }
}

/// Return `raw` unchanged if it is already a probability distribution,
/// otherwise treat it as logits and apply a softmax.
pub fn to_probabilities(raw: Vec<f32>) -> Vec<f32> {
    let sum: f32 = raw.iter().sum();
    let is_distribution = raw.iter().all(|v| (0.0..=1.0).contains(v))
        && (sum - 1.0).abs() <= DISTRIBUTION_TOLERANCE;

    if is_distribution {
        return raw;
    }

    let max = raw.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = raw.iter().map(|v| (v - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / total).collect()
}

/// Index and score of the highest-scoring class
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (index, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((index, score)),
        })
}

/// Label set for an output vector of `output_len` classes.
///
/// Uses `known` when its length matches, otherwise falls back to synthetic
/// `class_0`, `class_1`, ... names.
pub fn resolve_labels(known: &[String], output_len: usize) -> Vec<String> {
    if known.len() == output_len {
        return known.to_vec();
    }
    warn!(
        "Classifier returned {} scores but {} class names are configured; using synthetic labels",
        output_len,
        known.len()
    );
    (0..output_len).map(synthetic_label).collect()
}
