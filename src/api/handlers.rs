// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::http_server::AppState;
use crate::version;
use crate::vision::ModelAvailability;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub health: String,
    pub analyze: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub models: ModelAvailability,
}

/// GET / - Liveness message with pointers to the other endpoints
pub async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: format!("{} backend is running", version::SERVICE_NAME),
        health: "/health".to_string(),
        analyze: "/analyze".to_string(),
    })
}

/// GET /health - Per-model load status
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        models: state.models.availability(),
    })
}
