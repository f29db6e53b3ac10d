// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use guava_vision::{
    api::start_server,
    config::ServerConfig,
    version,
    vision::VisionModelManager,
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = ServerConfig::parse();
    config.validate()?;

    println!("🚀 Starting {}...\n", version::get_version_string());
    println!("📂 Models directory: {}", config.models_dir.display());
    println!();

    // Each model loads on its own; failures leave the slot unloaded
    println!("🧠 Loading vision models...");
    let models = VisionModelManager::new(config.vision_config()).await;
    models.log_status();

    if !models.has_classifier() {
        tracing::warn!("⚠️ Classification model unavailable - /analyze will return 503");
    }

    println!("🌐 Serving on http://{}", config.bind_addr()?);
    start_server(&config, Arc::new(models)).await?;

    println!("\n⏹️  Shutting down...");
    println!("👋 Goodbye!");
    Ok(())
}
