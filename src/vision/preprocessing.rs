// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the classification and YOLO models

use image::{imageops::FilterType, DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

use crate::config::TensorLayout;

/// Padding colour used by YOLO letterboxing
pub const LETTERBOX_FILL: u8 = 114;

/// Preprocess an image for the classification model
///
/// Steps:
/// 1. Resize (bilinear, aspect ratio not preserved) to `size` x `size`
/// 2. Scale pixel intensities to [0, 1]
/// 3. Add a batch dimension in the requested layout
pub fn preprocess_for_classification(
    image: &DynamicImage,
    size: u32,
    layout: TensorLayout,
) -> Array4<f32> {
    let resized = image.resize_exact(size, size, FilterType::Triangle);
    let rgb = resized.to_rgb8();
    let s = size as usize;

    let mut tensor = match layout {
        TensorLayout::Nhwc => Array4::zeros((1, s, s, 3)),
        TensorLayout::Nchw => Array4::zeros((1, 3, s, s)),
    };

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            match layout {
                TensorLayout::Nhwc => tensor[[0, y, x, c]] = value,
                TensorLayout::Nchw => tensor[[0, c, y, x]] = value,
            }
        }
    }

    tensor
}

/// Scale and padding applied by letterboxing.
/// Maps model-input coordinates back to the original image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Scale factor applied to the original image
    pub scale: f32,
    /// Horizontal padding on the left, in input pixels
    pub pad_x: f32,
    /// Vertical padding on the top, in input pixels
    pub pad_y: f32,
    /// Square model input size
    pub input_size: u32,
}

impl Letterbox {
    /// Compute letterbox geometry for an image of `width` x `height`
    pub fn new(width: u32, height: u32, input_size: u32) -> Self {
        if width == 0 || height == 0 {
            return Self {
                scale: 1.0,
                pad_x: 0.0,
                pad_y: 0.0,
                input_size,
            };
        }

        let scale = (input_size as f32 / width as f32).min(input_size as f32 / height as f32);
        let (new_w, new_h) = Self::scaled_dims(width, height, scale, input_size);

        Self {
            scale,
            pad_x: ((input_size - new_w) / 2) as f32,
            pad_y: ((input_size - new_h) / 2) as f32,
            input_size,
        }
    }

    fn scaled_dims(width: u32, height: u32, scale: f32, input_size: u32) -> (u32, u32) {
        let new_w = ((width as f32 * scale).round() as u32).clamp(1, input_size);
        let new_h = ((height as f32 * scale).round() as u32).clamp(1, input_size);
        (new_w, new_h)
    }

    /// Map a coordinate from model-input space back to original image space
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Preprocess an image for a YOLO model
///
/// Resizes with aspect ratio preserved, pads to a square of gray (114),
/// scales to [0, 1] and returns an NCHW tensor plus the letterbox geometry.
pub fn preprocess_for_yolo(image: &DynamicImage, input_size: u32) -> (Array4<f32>, Letterbox) {
    let (width, height) = image.dimensions();
    let letterbox = Letterbox::new(width, height, input_size);

    let mut canvas = RgbImage::from_pixel(
        input_size,
        input_size,
        Rgb([LETTERBOX_FILL, LETTERBOX_FILL, LETTERBOX_FILL]),
    );

    if width > 0 && height > 0 {
        let (new_w, new_h) = Letterbox::scaled_dims(width, height, letterbox.scale, input_size);
        let resized = image.resize_exact(new_w, new_h, FilterType::Triangle).to_rgb8();
        image::imageops::overlay(
            &mut canvas,
            &resized,
            letterbox.pad_x as i64,
            letterbox.pad_y as i64,
        );
    }

    let s = input_size as usize;
    let mut tensor = Array4::zeros((1, 3, s, s));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, letterbox)
}
