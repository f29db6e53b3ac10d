// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 output decoding shared by the detection and segmentation models
//!
//! YOLOv8 exports emit one column per anchor: `[cx, cy, w, h, class scores..., mask coeffs...]`
//! in model-input pixel space.

use anyhow::Result;
use ndarray::{Array2, ArrayD, ArrayView2, Axis, Ix3};
use std::cmp::Ordering;

use super::geometry::{ImageSize, PixelBox};
use super::preprocessing::Letterbox;
use super::session::synthetic_label;

/// Upper bound on boxes kept after NMS
pub const MAX_DETECTIONS: usize = 300;

/// A decoded anchor that passed the confidence threshold
#[derive(Debug, Clone)]
pub struct YoloCandidate {
    pub class_id: usize,
    pub confidence: f32,
    /// Box in model-input pixel space
    pub bbox: PixelBox,
    /// Column index in the raw output (used to look up mask coefficients)
    pub anchor: usize,
}

/// Strides of the three YOLOv8 detection heads
pub const HEAD_STRIDES: [u32; 3] = [8, 16, 32];

/// Number of anchors a YOLOv8 export emits for a square `input_size`
pub fn anchor_count(input_size: u32) -> usize {
    HEAD_STRIDES
        .iter()
        .map(|stride| {
            let cells = (input_size / stride) as usize;
            cells * cells
        })
        .sum()
}

/// Reshape a raw `[1, F, N]` (or transposed `[1, N, F]`) output into `[F, N]`.
///
/// With `anchors` known the anchor axis is matched by length. Without it,
/// the longer axis is taken as the anchor axis.
pub fn predictions_matrix(output: ArrayD<f32>, anchors: Option<usize>) -> Result<Array2<f32>> {
    let output = output
        .into_dimensionality::<Ix3>()
        .map_err(|e| anyhow::anyhow!("Unexpected YOLO output rank: {}", e))?;
    let matrix = output.index_axis(Axis(0), 0).to_owned();

    let transpose = match anchors {
        Some(n) if matrix.ncols() == n => false,
        Some(n) if matrix.nrows() == n => true,
        Some(n) => anyhow::bail!(
            "YOLO output shape {:?} has no axis of {} anchors",
            matrix.shape(),
            n
        ),
        None => matrix.nrows() > matrix.ncols(),
    };

    if transpose {
        Ok(matrix.reversed_axes())
    } else {
        Ok(matrix)
    }
}

/// Decode every anchor whose best class score reaches `confidence`
pub fn decode_candidates(
    predictions: ArrayView2<f32>,
    num_classes: usize,
    confidence: f32,
) -> Vec<YoloCandidate> {
    if num_classes == 0 || predictions.nrows() < 4 + num_classes {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    for (anchor, column) in predictions.axis_iter(Axis(1)).enumerate() {
        let (class_id, score) = (0..num_classes)
            .map(|c| (c, column[4 + c]))
            .fold((0, f32::NEG_INFINITY), |best, current| {
                if current.1 > best.1 {
                    current
                } else {
                    best
                }
            });

        if score < confidence {
            continue;
        }

        candidates.push(YoloCandidate {
            class_id,
            confidence: score,
            bbox: PixelBox::from_center(column[0], column[1], column[2], column[3]),
            anchor,
        });
    }
    candidates
}

/// Greedy class-aware non-maximum suppression
pub fn non_max_suppression(
    mut candidates: Vec<YoloCandidate>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<YoloCandidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut keep: Vec<YoloCandidate> = Vec::new();
    for candidate in candidates {
        if keep.len() >= max_detections {
            break;
        }
        let suppressed = keep.iter().any(|kept| {
            kept.class_id == candidate.class_id && kept.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}

/// Map a model-input box back onto the original image, clamped to its bounds
pub fn to_original_box(bbox: &PixelBox, letterbox: &Letterbox, size: ImageSize) -> PixelBox {
    let (x1, y1) = letterbox.to_original(bbox.x1, bbox.y1);
    let (x2, y2) = letterbox.to_original(bbox.x2, bbox.y2);
    PixelBox::new(x1, y1, x2, y2).clamp_to(size)
}

/// Class name for `class_id`, synthetic when the model ships no name for it
pub fn label_for(names: &[String], class_id: usize) -> String {
    names
        .get(class_id)
        .cloned()
        .unwrap_or_else(|| synthetic_label(class_id))
}
