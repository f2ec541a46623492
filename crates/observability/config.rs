use std::env;
use url::Url;

#[derive(Clone)]
pub struct ServiceContext {
    pub service_name: String,
    pub environment: String,
    pub component: String,
}

#[derive(Clone)]
pub(crate) struct OpsWebhookConfig {
    pub(crate) webhook_url: Url,
}

#[derive(Clone)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service_context: ServiceContext,
    pub(crate) ops_webhook: Option<OpsWebhookConfig>,
    /// Warnings captured during config parsing so they can be logged after tracing is initialized.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        let component = component.trim().to_string();

        let service_name = env_string("SERVICE_NAME")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| component.clone());

        let environment = env_string("STAGE")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        let service_context = ServiceContext {
            service_name,
            environment,
            component,
        };

        let (ops_webhook, warnings) = webhook_from_env();

        Self {
            service_context,
            ops_webhook,
            warnings,
        }
    }
}

fn webhook_from_env() -> (Option<OpsWebhookConfig>, Vec<String>) {
    let mut warnings = Vec::new();

    let webhook_url = match env_string("OPS_ALERT_WEBHOOK_URL").filter(|v| !v.is_empty()) {
        Some(raw) => match Url::parse(&raw) {
            Ok(url) => Some(url),
            Err(err) => {
                // Do not include the raw URL in logs (webhook URLs contain secrets).
                warnings.push(format!(
                    "OPS_ALERT_WEBHOOK_URL is set but invalid; ops alerts disabled (parse error: {err})"
                ));
                None
            }
        },
        None => None,
    };

    (
        webhook_url.map(|webhook_url| OpsWebhookConfig { webhook_url }),
        warnings,
    )
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok()
}
