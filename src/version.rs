// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the GuavaVision diagnosis service

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Service name used in logs and the root endpoint
pub const SERVICE_NAME: &str = "GuavaVision";

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("{} backend {}", SERVICE_NAME, VERSION_NUMBER)
}
