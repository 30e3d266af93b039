//! Logging and tracing bootstrap.

use std::sync::Arc;

use async_trait::async_trait;
use shelf_kernel::settings::{LogFormat, TelemetrySettings};
use shelf_kernel::{InitCtx, Module};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Calling this more than once is harmless; later calls keep the first
/// subscriber.
pub fn init(settings: &TelemetrySettings) {
    let filter = env_filter(settings);
    let registry = tracing_subscriber::registry().with(filter);

    // stdout is reserved for command output
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let installed = match settings.log_format {
        LogFormat::Pretty => registry.with(layer).try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(
            target: "shelf-telemetry",
            format = ?settings.log_format,
            "telemetry initialized"
        );
    }
}

fn env_filter(settings: &TelemetrySettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Core module reporting telemetry state through the lifecycle.
pub struct TelemetryModule;

#[async_trait]
impl Module for TelemetryModule {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            format = ?ctx.settings.telemetry.log_format,
            level = %ctx.settings.telemetry.log_level,
            "telemetry module initialized"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "telemetry module stopped");
        Ok(())
    }
}

/// Create a new instance of the telemetry module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(TelemetryModule)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_level_falls_back_to_info() {
        let settings = TelemetrySettings {
            log_format: LogFormat::Pretty,
            log_level: "not a [valid filter".to_string(),
        };
        // Only meaningful when RUST_LOG is unset, but must never panic.
        let _ = env_filter(&settings);
    }

    #[test]
    fn init_twice_is_harmless() {
        let settings = TelemetrySettings::default();
        init(&settings);
        init(&settings);
    }

    #[tokio::test]
    async fn module_runs_through_lifecycle() {
        let settings = shelf_kernel::Settings::default();
        let ctx = InitCtx {
            settings: &settings,
        };
        let module = create_module();

        assert_eq!(module.name(), "telemetry");
        module.init(&ctx).await.unwrap();
        module.start(&ctx).await.unwrap();
        module.stop().await.unwrap();
    }
}
