// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pixel-space boxes and points, and their conversion to percentages of the
//! image size so that results are independent of the upload resolution.

use serde::{Deserialize, Serialize};

/// Width and height of the decoded upload in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned box in pixel coordinates, corners `(x1, y1)` and `(x2, y2)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl PixelBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from a YOLO centre box `(cx, cy, w, h)`
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over union with another box
    pub fn iou(&self, other: &PixelBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = (x2 - x1) * (y2 - y1);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }

    /// Restrict the box to `[0, width] x [0, height]`
    pub fn clamp_to(&self, size: ImageSize) -> Self {
        let w = size.width as f32;
        let h = size.height as f32;
        let x1 = self.x1.clamp(0.0, w);
        let y1 = self.y1.clamp(0.0, h);
        Self {
            x1,
            y1,
            x2: self.x2.clamp(x1, w),
            y2: self.y2.clamp(y1, h),
        }
    }

    /// Convert to `[x, y, width, height]` as percentages of the image size.
    ///
    /// x = x1/W*100, y = y1/H*100, width = (x2-x1)/W*100, height = (y2-y1)/H*100,
    /// computed on the box clamped to the image so every component is in [0, 100].
    pub fn to_percent(&self, size: ImageSize) -> [f32; 4] {
        if size.width == 0 || size.height == 0 {
            return [0.0; 4];
        }
        let clamped = self.clamp_to(size);
        let w = size.width as f32;
        let h = size.height as f32;
        [
            clamped.x1 / w * 100.0,
            clamped.y1 / h * 100.0,
            (clamped.x2 - clamped.x1) / w * 100.0,
            (clamped.y2 - clamped.y1) / h * 100.0,
        ]
    }
}

/// A polygon vertex in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

impl PixelPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Convert to `(x, y)` percentages of the image size, clamped to [0, 100]
    pub fn to_percent(&self, size: ImageSize) -> (f32, f32) {
        if size.width == 0 || size.height == 0 {
            return (0.0, 0.0);
        }
        let x = (self.x / size.width as f32 * 100.0).clamp(0.0, 100.0);
        let y = (self.y / size.height as f32 * 100.0).clamp(0.0, 100.0);
        (x, y)
    }
}
