pub mod alerts;
pub mod config;

use anyhow::Result;
use config::ObservabilityConfig;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use alerts::OpsAlerts;

pub fn init_observability(component: &str) -> Result<OpsAlerts> {
    let config = ObservabilityConfig::from_env(component);

    // EnvFilter (RUST_LOG) with a safe default to avoid forcing TRACE in production.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Default `SystemTime` formatter prints RFC3339 in UTC (`...Z`).
    // Use local time so `TZ=Africa/Kampala` shows `+03:00` in logs.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()?;

    // Make optional alert sink misconfiguration visible during startup.
    for warning in &config.warnings {
        warn!(
            service = %config.service_context.service_name,
            environment = %config.service_context.environment,
            component = %config.service_context.component,
            warning = %warning,
            "Observability config warning"
        );
    }

    let alerts = match config.ops_webhook {
        Some(webhook) => {
            info!(
                service = %config.service_context.service_name,
                environment = %config.service_context.environment,
                component = %config.service_context.component,
                "Ops webhook alerts enabled"
            );
            OpsAlerts::new(webhook.webhook_url, config.service_context.clone())
        }
        None => {
            info!(
                service = %config.service_context.service_name,
                environment = %config.service_context.environment,
                component = %config.service_context.component,
                "Ops webhook alerts disabled"
            );
            OpsAlerts::disabled()
        }
    };

    Ok(alerts)
}
