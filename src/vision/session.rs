// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX Runtime session construction shared by all three predictors

use anyhow::{Context, Result};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info, warn};

/// Intra-op threads per session
const INTRA_THREADS: usize = 4;

/// Load an ONNX model, trying CUDA first and falling back to CPU
///
/// # Errors
/// Returns error if:
/// - Model file not found
/// - ONNX Runtime initialization fails on every provider
pub fn build_session(model_path: &Path) -> Result<Session> {
    if !model_path.exists() {
        anyhow::bail!("ONNX model file not found: {}", model_path.display());
    }

    debug!("Attempting CUDA execution provider for {}", model_path.display());
    let cuda_result = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CUDAExecutionProvider::default().build()])
        .context("Failed to set CUDA execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(INTRA_THREADS)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path);

    match cuda_result {
        Ok(session) => {
            info!("CUDA execution provider initialized for {}", model_path.display());
            Ok(session)
        }
        Err(e) => {
            warn!("CUDA execution provider failed: {}", e);
            warn!("   Falling back to CPU execution provider");
            Session::builder()
                .context("Failed to create session builder")?
                .with_execution_providers([CPUExecutionProvider::default().build()])
                .context("Failed to set CPU execution provider")?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .context("Failed to set optimization level")?
                .with_intra_threads(INTRA_THREADS)
                .context("Failed to set intra threads")?
                .commit_from_file(model_path)
                .context(format!(
                    "Failed to load ONNX model from {}",
                    model_path.display()
                ))
        }
    }
}

/// Name of the first model input, or `fallback` if the graph does not report one
pub fn first_input_name(session: &Session, fallback: &str) -> String {
    session
        .inputs
        .first()
        .map(|input| input.name.clone())
        .unwrap_or_else(|| fallback.to_string())
}

/// Read class names from the `names` metadata entry written by YOLO exporters
pub fn read_class_names(session: &Session) -> Option<Vec<String>> {
    let metadata = session.metadata().ok()?;
    let raw = metadata.custom("names").ok()??;
    parse_class_names(&raw)
}

/// Parse a Python-style dict such as `{0: 'leaf', 1: 'red rust'}` into an
/// index-ordered list. Gaps are filled with synthetic `class_N` names.
pub fn parse_class_names(raw: &str) -> Option<Vec<String>> {
    let pattern = Regex::new(r#"(\d+)\s*:\s*['"]([^'"]*)['"]"#).ok()?;

    let entries: Vec<(usize, String)> = pattern
        .captures_iter(raw)
        .filter_map(|cap| {
            let index = cap.get(1)?.as_str().parse::<usize>().ok()?;
            let name = cap.get(2)?.as_str().to_string();
            Some((index, name))
        })
        .collect();

    let count = entries.iter().map(|(index, _)| index + 1).max()?;
    let mut names: Vec<String> = (0..count).map(synthetic_label).collect();
    for (index, name) in entries {
        names[index] = name;
    }
    Some(names)
}

/// Placeholder label for class indices with no known name
pub fn synthetic_label(index: usize) -> String {
    format!("class_{}", index)
}
