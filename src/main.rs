// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use secret_copy_operator::config::Config;
use secret_copy_operator::kubernetes::{ClusterManager, KubeconfigClientFactory};
use secret_copy_operator::reconcilers::SecretCopyReconciler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing, LOG_FORMAT=json switches to JSON lines
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| fmt::layer().json().with_target(true)))
        .with((!json).then(|| fmt::layer().with_target(true)))
        .init();

    info!("Starting secret copy operator v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::from_env()?;
    info!(
        cluster_name = %config.cluster_name,
        max_concurrent_reconciles = config.max_concurrent_reconciles,
        client_cache_ttl = ?config.client_cache_ttl,
        request_timeout = ?config.request_timeout,
        "Configuration loaded"
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let clusters = Arc::new(ClusterManager::new(
        config.client_cache_ttl,
        config.max_concurrent_reconciles,
        KubeconfigClientFactory::new(config.request_timeout),
    ));

    SecretCopyReconciler::new(client, clusters, config).run().await?;

    info!("Shutdown complete");
    Ok(())
}
