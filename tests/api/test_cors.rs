// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Cross-origin tests
//!
//! The dev front-end origins are allowed without credentials; other origins
//! get no allow-origin header.

use super::support::*;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use guava_vision::api::create_app;
use tower::util::ServiceExt; // for `oneshot`

fn preflight(origin: &str) -> Request<Body> {
    Request::builder()
        .method(Method::OPTIONS)
        .uri("/analyze")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap()
}

#[cfg(test)]
mod cors_tests {
    use super::*;

    /// Test 1: Vite dev server origin is allowed
    #[tokio::test]
    async fn test_dev_origin_allowed() {
        let app = create_app(full_state());

        let response = app.oneshot(preflight("http://localhost:5173")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "http://localhost:5173"
        );
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .is_none());
    }

    /// Test 2: Loopback IP variant is allowed
    #[tokio::test]
    async fn test_loopback_origin_allowed() {
        let app = create_app(full_state());

        let response = app.oneshot(preflight("http://127.0.0.1:5173")).await.unwrap();
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "http://127.0.0.1:5173"
        );
    }

    /// Test 3: Unknown origin gets no allow-origin header
    #[tokio::test]
    async fn test_unknown_origin_not_allowed() {
        let app = create_app(full_state());

        let response = app.oneshot(preflight("http://evil.example")).await.unwrap();
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
