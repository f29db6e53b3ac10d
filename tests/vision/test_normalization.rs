// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Coordinate normalization tests
//!
//! These tests verify that:
//! - Pixel boxes become [x, y, w, h] percentages of the original image
//! - Letterboxed YOLO outputs map back onto the original image
//! - Every normalized value stays within [0, 100]

use guava_vision::vision::{
    geometry::{ImageSize, PixelBox, PixelPoint},
    preprocessing::{preprocess_for_yolo, Letterbox},
    yolo::{decode_candidates, non_max_suppression, predictions_matrix, to_original_box},
};
use image::DynamicImage;
use ndarray::Array3;

#[cfg(test)]
mod normalization_tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    /// Test 1: Leaf box in a 640x480 frame
    #[test]
    fn test_leaf_box_percentages() {
        let bbox = PixelBox::new(100.0, 50.0, 300.0, 250.0);
        let [x, y, w, h] = bbox.to_percent(ImageSize::new(640, 480));

        assert!(approx(x, 15.625));
        assert!(approx(y, 10.4167));
        assert!(approx(w, 31.25));
        assert!(approx(h, 41.6667));
    }

    /// Test 2: Boxes spilling outside the frame are clamped
    #[test]
    fn test_out_of_frame_box_clamped() {
        let bbox = PixelBox::new(-20.0, 400.0, 700.0, 600.0);
        let values = bbox.to_percent(ImageSize::new(640, 480));

        for v in values {
            assert!((0.0..=100.0).contains(&v), "component {} out of range", v);
        }
        assert!(approx(values[0], 0.0));
        assert!(approx(values[2], 100.0));
        assert!(approx(values[0] + values[2], 100.0));
        assert!(approx(values[1] + values[3], 100.0));
    }

    /// Test 3: Points are clamped independently
    #[test]
    fn test_points_clamped() {
        let size = ImageSize::new(200, 100);
        assert_eq!(PixelPoint::new(100.0, 50.0).to_percent(size), (50.0, 50.0));
        assert_eq!(PixelPoint::new(-5.0, 150.0).to_percent(size), (0.0, 100.0));
    }

    /// Test 4: Letterbox for a landscape upload pads top and bottom
    #[test]
    fn test_letterbox_landscape() {
        let (tensor, letterbox) = preprocess_for_yolo(&DynamicImage::new_rgb8(640, 480), 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_eq!(letterbox.pad_x, 0.0);
        assert_eq!(letterbox.pad_y, 80.0);
        assert_eq!(letterbox.to_original(100.0, 130.0), (100.0, 50.0));
    }

    /// Test 5: Raw YOLOv8 output decodes to the expected percentage box
    #[test]
    fn test_yolo_output_to_percentages() {
        // [1, 4 + 2 classes, 8 anchors]; anchor 0 is the leaf in letterboxed space
        let mut raw = Array3::<f32>::zeros((1, 6, 8));
        let leaf = [200.0, 230.0, 200.0, 200.0, 0.9, 0.05];
        for (feature, value) in leaf.iter().enumerate() {
            raw[[0, feature, 0]] = *value;
        }
        raw[[0, 4, 1]] = 0.1; // below threshold
        raw[[0, 5, 2]] = 0.2; // below threshold

        let size = ImageSize::new(640, 480);
        let letterbox = Letterbox::new(640, 480, 640);
        let predictions = predictions_matrix(raw.into_dyn(), None).unwrap();
        let candidates = decode_candidates(predictions.view(), 2, 0.25);
        let kept = non_max_suppression(candidates, 0.7, 300);

        assert_eq!(kept.len(), 1);
        let original = to_original_box(&kept[0].bbox, &letterbox, size);
        let [x, y, w, h] = original.to_percent(size);
        assert!(approx(x, 15.625));
        assert!(approx(y, 10.4167));
        assert!(approx(w, 31.25));
        assert!(approx(h, 41.6667));
    }

    /// Test 6: Zero-sized image never divides by zero
    #[test]
    fn test_zero_size_image() {
        let bbox = PixelBox::new(1.0, 1.0, 2.0, 2.0);
        assert_eq!(bbox.to_percent(ImageSize::new(0, 0)), [0.0; 4]);
    }
}
