// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! GET /health and GET / tests
//!
//! These tests verify that:
//! - /health reports each model's load state independently
//! - A service with no models still answers /health and /
//! - / returns the liveness message with endpoint pointers

use super::support::*;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use guava_vision::{api::create_app, vision::ModelState};
use tower::util::ServiceExt; // for `oneshot`

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[cfg(test)]
mod health_endpoint_tests {
    use super::*;

    /// Test 1: All models loaded
    #[tokio::test]
    async fn test_health_all_loaded() {
        let app = create_app(full_state());

        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["models"]["classification"], true);
        assert_eq!(json["models"]["detection"], true);
        assert_eq!(json["models"]["segmentation"], true);
    }

    /// Test 2: Detection failed to load, the others did not
    #[tokio::test]
    async fn test_health_reflects_partial_failure() {
        let state = state_with(
            loaded_classifier(default_scores()),
            ModelState::unloaded("Failed to load ONNX model"),
            loaded_segmenter(spot_segmenter()),
        );
        let app = create_app(state);

        let json = json_body(app.oneshot(get("/health")).await.unwrap()).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["models"]["classification"], true);
        assert_eq!(json["models"]["detection"], false);
        assert_eq!(json["models"]["segmentation"], true);
    }

    /// Test 3: Nothing loaded still serves health
    #[tokio::test]
    async fn test_health_nothing_loaded() {
        let state = state_with(
            ModelState::unloaded("missing"),
            ModelState::unloaded("missing"),
            ModelState::unloaded("missing"),
        );
        let app = create_app(state);

        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["models"]["classification"], false);
        assert_eq!(json["models"]["detection"], false);
        assert_eq!(json["models"]["segmentation"], false);
    }

    /// Test 4: Root liveness message
    #[tokio::test]
    async fn test_root_liveness() {
        let app = create_app(full_state());

        let response = app.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["message"], "GuavaVision backend is running");
        assert_eq!(json["health"], "/health");
        assert_eq!(json["analyze"], "/analyze");
    }

    /// Test 5: /analyze only accepts POST
    #[tokio::test]
    async fn test_analyze_rejects_get() {
        let app = create_app(full_state());

        let response = app.oneshot(get("/analyze")).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
