// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod server;

pub use server::{ServerConfig, TensorLayout, DEFAULT_CLASS_NAMES, DEFAULT_CORS_ORIGINS};
