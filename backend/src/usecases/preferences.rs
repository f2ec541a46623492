use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use crates::{
    domain::value_objects::currency::CurrencyPreference,
    geo::{
        country_currency::currency_for_country,
        geo_client::{GeoClient, GeoInfo, flag_emoji, probe_ip},
    },
};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait GeoGateway: Send + Sync {
    async fn lookup(&self, ip: &str) -> AnyResult<GeoInfo>;
}

#[async_trait]
impl GeoGateway for GeoClient {
    async fn lookup(&self, ip: &str) -> AnyResult<GeoInfo> {
        self.lookup(ip).await
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PreferenceDto {
    pub country: String,
    pub country_code: String,
    pub currency_code: String,
    pub flag: Option<String>,
    /// False when geolocation failed and the USD default was served.
    pub resolved: bool,
}

impl PreferenceDto {
    fn from_preference(preference: CurrencyPreference, resolved: bool) -> Self {
        Self {
            country: preference.country,
            country_code: preference.country_code,
            currency_code: preference.currency_code,
            flag: preference.flag,
            resolved,
        }
    }
}

/// Resolves a visitor's display currency from their IP, once per session.
/// Failures degrade to the USD default and are not cached, so a later
/// request gets another chance.
pub struct PreferenceUseCase<G>
where
    G: GeoGateway + Send + Sync + 'static,
{
    geo_gateway: Arc<G>,
    cache: RwLock<HashMap<String, CurrencyPreference>>,
}

impl<G> PreferenceUseCase<G>
where
    G: GeoGateway + Send + Sync + 'static,
{
    pub fn new(geo_gateway: Arc<G>) -> Self {
        Self {
            geo_gateway,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, client_ip: &str) -> PreferenceDto {
        let key = probe_ip(client_ip).to_string();

        if let Some(preference) = self.cache.read().await.get(&key) {
            debug!(ip = %key, currency = %preference.currency_code, "preferences: cache hit");
            return PreferenceDto::from_preference(preference.clone(), true);
        }

        match self.geo_gateway.lookup(&key).await {
            Ok(geo) => {
                let preference = CurrencyPreference {
                    currency_code: currency_for_country(&geo.country_code).to_string(),
                    flag: flag_emoji(&geo.country_code),
                    country: geo.country,
                    country_code: geo.country_code,
                };

                info!(
                    ip = %key,
                    country = %preference.country,
                    currency = %preference.currency_code,
                    "preferences: resolved visitor currency"
                );

                self.cache
                    .write()
                    .await
                    .insert(key, preference.clone());

                PreferenceDto::from_preference(preference, true)
            }
            Err(err) => {
                warn!(
                    ip = %key,
                    error = ?err,
                    "preferences: geolocation failed, serving USD default"
                );
                PreferenceDto::from_preference(CurrencyPreference::usd_default(), false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_and_caches_per_ip() {
        let mut gateway = MockGeoGateway::new();
        gateway.expect_lookup().times(1).returning(|_| {
            Box::pin(async {
                Ok(GeoInfo {
                    country: "Uganda".to_string(),
                    country_code: "UG".to_string(),
                })
            })
        });

        let usecase = PreferenceUseCase::new(Arc::new(gateway));

        let first = usecase.resolve("203.0.113.9").await;
        // Second resolve for the same IP must be served from the cache.
        let second = usecase.resolve("203.0.113.9").await;

        assert_eq!(first.currency_code, "UGX");
        assert_eq!(first.flag.as_deref(), Some("\u{1F1FA}\u{1F1EC}"));
        assert!(first.resolved);
        assert_eq!(second.currency_code, "UGX");
    }

    #[tokio::test]
    async fn loopback_addresses_share_the_probe_entry() {
        let mut gateway = MockGeoGateway::new();
        gateway.expect_lookup().times(1).returning(|_| {
            Box::pin(async {
                Ok(GeoInfo {
                    country: "United States".to_string(),
                    country_code: "US".to_string(),
                })
            })
        });

        let usecase = PreferenceUseCase::new(Arc::new(gateway));

        usecase.resolve("127.0.0.1").await;
        let second = usecase.resolve("::1").await;

        assert_eq!(second.currency_code, "USD");
    }

    #[tokio::test]
    async fn lookup_failure_degrades_to_usd_and_is_not_cached() {
        let mut gateway = MockGeoGateway::new();
        gateway
            .expect_lookup()
            .times(2)
            .returning(|_| Box::pin(async { Err(anyhow::anyhow!("geo upstream down")) }));

        let usecase = PreferenceUseCase::new(Arc::new(gateway));

        let first = usecase.resolve("203.0.113.9").await;
        assert_eq!(first.currency_code, "USD");
        assert!(!first.resolved);

        // A retry must reach the gateway again instead of a cached failure.
        let second = usecase.resolve("203.0.113.9").await;
        assert!(!second.resolved);
    }
}
