// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Instance segmentation model (YOLOv8-seg)
//!
//! Each instance mask is assembled from the prototype masks, cropped to its box,
//! thresholded and traced into a polygon outline in original-image pixels.

use anyhow::{anyhow, Context, Result};
use image::{imageops::FilterType, DynamicImage, GenericImageView, GrayImage, ImageBuffer, Luma};
use imageproc::contours::{find_contours, BorderType};
use ndarray::{Array1, Array3, ArrayD, ArrayView1, Ix3};
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use super::geometry::{ImageSize, PixelBox, PixelPoint};
use super::preprocessing::{preprocess_for_yolo, Letterbox};
use super::session::{build_session, first_input_name, read_class_names};
use super::yolo::{
    anchor_count, decode_candidates, label_for, non_max_suppression, predictions_matrix,
    to_original_box, MAX_DETECTIONS,
};

/// Mask probability threshold
pub const MASK_THRESHOLD: f32 = 0.5;

/// A segmented instance in original-image pixels
#[derive(Debug, Clone, PartialEq)]
pub struct PixelInstance {
    pub label: String,
    pub class_id: usize,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    pub bbox: PixelBox,
    /// Outline of the instance mask; `None` when the mask is empty
    pub polygon: Option<Vec<PixelPoint>>,
}

/// Black-box segmentation predictor
#[cfg_attr(test, mockall::automock)]
pub trait SegmentationPredictor: Send + Sync {
    /// Segment instances scoring at least `confidence`
    fn predict(&self, image: &DynamicImage, confidence: f32) -> Result<Vec<PixelInstance>>;
}

/// YOLOv8-seg ONNX model
pub struct YoloSegmenter {
    session: Mutex<Session>,
    input_name: String,
    class_names: Vec<String>,
    input_size: u32,
    iou_threshold: f32,
}

impl std::fmt::Debug for YoloSegmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloSegmenter")
            .field("input_name", &self.input_name)
            .field("class_names", &self.class_names)
            .field("input_size", &self.input_size)
            .finish_non_exhaustive()
    }
}

impl YoloSegmenter {
    /// Load a YOLOv8-seg export
    pub async fn new<P: AsRef<Path>>(model_path: P, input_size: u32, iou_threshold: f32) -> Result<Self> {
        let model_path = model_path.as_ref();
        info!("Loading segmentation model from {}", model_path.display());

        let session = build_session(model_path)?;
        if session.outputs.len() < 2 {
            anyhow::bail!(
                "Segmentation model {} must expose detection and prototype outputs, found {}",
                model_path.display(),
                session.outputs.len()
            );
        }
        let input_name = first_input_name(&session, "images");
        let class_names = read_class_names(&session).unwrap_or_default();
        debug!(
            "Segmentation model loaded - input: {}, classes: {:?}",
            input_name, class_names
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            class_names,
            input_size,
            iou_threshold,
        })
    }
}

impl SegmentationPredictor for YoloSegmenter {
    fn predict(&self, image: &DynamicImage, confidence: f32) -> Result<Vec<PixelInstance>> {
        let (width, height) = image.dimensions();
        let size = ImageSize::new(width, height);
        let (tensor, letterbox) = preprocess_for_yolo(image, self.input_size);
        let input_value = Value::from_array(tensor).context("Failed to create input tensor")?;

        let (raw, raw_protos): (ArrayD<f32>, ArrayD<f32>) = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow!("Segmentation session lock poisoned"))?;
            let outputs = session
                .run(ort::inputs![&self.input_name => input_value])
                .context("Segmentation inference failed")?;
            let detections = outputs[0]
                .try_extract_array::<f32>()
                .context("Failed to extract detection output")?
                .to_owned();
            let protos = outputs[1]
                .try_extract_array::<f32>()
                .context("Failed to extract prototype output")?
                .to_owned();
            (detections, protos)
        };

        let protos = prototype_masks(raw_protos)?;
        let mask_dim = protos.shape()[0];
        let predictions = predictions_matrix(raw, Some(anchor_count(self.input_size)))?;
        let num_classes = predictions
            .nrows()
            .checked_sub(4 + mask_dim)
            .ok_or_else(|| anyhow!("Segmentation output has too few features"))?;

        let candidates = decode_candidates(predictions.view(), num_classes, confidence);
        let kept = non_max_suppression(candidates, self.iou_threshold, MAX_DETECTIONS);
        debug!("Segmentation kept {} instances", kept.len());

        let mut instances = Vec::with_capacity(kept.len());
        for candidate in kept {
            let column = predictions.column(candidate.anchor);
            let coeffs = column.slice(ndarray::s![4 + num_classes..4 + num_classes + mask_dim]);
            let polygon = instance_polygon(coeffs, &protos, &candidate.bbox, &letterbox, size)?;

            instances.push(PixelInstance {
                label: label_for(&self.class_names, candidate.class_id),
                class_id: candidate.class_id,
                confidence: candidate.confidence,
                bbox: to_original_box(&candidate.bbox, &letterbox, size),
                polygon,
            });
        }

        Ok(instances)
    }
}

/// Drop the batch axis of the `[1, nm, mh, mw]` prototype output
fn prototype_masks(raw: ArrayD<f32>) -> Result<Array3<f32>> {
    let shape = raw.shape().to_vec();
    if shape.len() != 4 || shape[0] != 1 {
        anyhow::bail!("Unexpected prototype output shape: {:?}", shape);
    }
    let protos = raw
        .index_axis_move(ndarray::Axis(0), 0)
        .into_dimensionality::<Ix3>()
        .map_err(|e| anyhow!("Unexpected prototype output rank: {}", e))?;
    Ok(protos)
}

/// Compute the mask for one instance and trace its largest outer contour.
///
/// `bbox` is in model-input space; the returned polygon is in original-image pixels.
pub fn instance_polygon(
    coeffs: ArrayView1<f32>,
    protos: &Array3<f32>,
    bbox: &PixelBox,
    letterbox: &Letterbox,
    size: ImageSize,
) -> Result<Option<Vec<PixelPoint>>> {
    let (mask_dim, mh, mw) = protos.dim();
    if coeffs.len() != mask_dim {
        anyhow::bail!(
            "Mask coefficient count {} does not match prototype count {}",
            coeffs.len(),
            mask_dim
        );
    }

    // sigmoid(coeffs . protos) at prototype resolution
    let flat = protos
        .view()
        .into_shape_with_order((mask_dim, mh * mw))
        .context("Failed to flatten prototype masks")?;
    let logits: Array1<f32> = coeffs.dot(&flat);
    let probabilities: Vec<f32> = logits.iter().map(|v| 1.0 / (1.0 + (-v).exp())).collect();

    let proto_mask: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_raw(mw as u32, mh as u32, probabilities)
            .ok_or_else(|| anyhow!("Prototype mask buffer size mismatch"))?;

    let input_size = letterbox.input_size;
    let upsampled = image::imageops::resize(&proto_mask, input_size, input_size, FilterType::Triangle);

    // Binary mask cropped to the instance box
    let limit = input_size as f32;
    let x_start = bbox.x1.clamp(0.0, limit).floor() as u32;
    let y_start = bbox.y1.clamp(0.0, limit).floor() as u32;
    let x_end = bbox.x2.clamp(0.0, limit).ceil() as u32;
    let y_end = bbox.y2.clamp(0.0, limit).ceil() as u32;

    let mut binary = GrayImage::new(input_size, input_size);
    let mut filled = 0usize;
    for y in y_start..y_end {
        for x in x_start..x_end {
            if upsampled.get_pixel(x, y)[0] > MASK_THRESHOLD {
                binary.put_pixel(x, y, Luma([255u8]));
                filled += 1;
            }
        }
    }

    if filled == 0 {
        return Ok(None);
    }

    Ok(largest_outline(&binary).map(|points| {
        points
            .into_iter()
            .map(|(x, y)| {
                let (ox, oy) = letterbox.to_original(x as f32, y as f32);
                PixelPoint::new(
                    ox.clamp(0.0, size.width as f32),
                    oy.clamp(0.0, size.height as f32),
                )
            })
            .collect()
    }))
}

/// Points of the outer contour with the most vertices
fn largest_outline(binary: &GrayImage) -> Option<Vec<(i32, i32)>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer)
        .max_by_key(|contour| contour.points.len())
        .map(|contour| contour.points.into_iter().map(|p| (p.x, p.y)).collect())
}
