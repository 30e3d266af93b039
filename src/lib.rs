//! SHELF application library.
//!
//! Wires the catalog modules into the kernel registry and runs the HTTP server.

pub mod modules;

use anyhow::Context;
use shelf_kernel::{InitCtx, ModuleRegistry, Settings};

/// Build the registry with the core modules and every application module
pub fn build_registry(settings: &Settings) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register_core(shelf_telemetry::create_module());
    modules::register_all(&mut registry, settings);
    registry
}

/// Boot every module, serve HTTP until Ctrl-C, then stop modules in reverse
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let registry = build_registry(&settings);
    let ctx = InitCtx {
        settings: &settings,
    };

    registry
        .init_all(&ctx)
        .await
        .context("module initialization failed")?;
    registry
        .start_all(&ctx)
        .await
        .context("module startup failed")?;

    let served = shelf_http::start_server(&registry, &settings, shutdown_signal()).await;

    registry.stop_all().await?;
    served
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
