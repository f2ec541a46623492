use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::Utc;
use crates::{
    domain::value_objects::currency::RateTable,
    rates::{rate_cache::RateCache, rate_client::RateClient},
};
use thiserror::Error;
use tracing::{debug, error, info};

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait RateGateway: Send + Sync {
    async fn fetch_fiat_rates(&self) -> AnyResult<HashMap<String, f64>>;

    async fn fetch_usdc_rate(&self) -> AnyResult<f64>;
}

#[async_trait]
impl RateGateway for RateClient {
    async fn fetch_fiat_rates(&self) -> AnyResult<HashMap<String, f64>> {
        self.fetch_fiat_rates().await
    }

    async fn fetch_usdc_rate(&self) -> AnyResult<f64> {
        self.fetch_usdc_rate().await
    }
}

#[derive(Debug, Error)]
pub enum RateError {
    #[error("exchange rates are currently unavailable")]
    Unavailable,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RateError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            RateError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            RateError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, RateError>;

/// Serves the shared rate snapshot, refreshing both upstreams whenever the
/// cached table has aged past its window. A failed refresh never extends a
/// stale table; conversion just reports unavailable.
pub struct RateUseCase<G>
where
    G: RateGateway + Send + Sync + 'static,
{
    rate_gateway: Arc<G>,
    cache: Arc<RateCache>,
}

impl<G> RateUseCase<G>
where
    G: RateGateway + Send + Sync + 'static,
{
    pub fn new(rate_gateway: Arc<G>, cache: Arc<RateCache>) -> Self {
        Self {
            rate_gateway,
            cache,
        }
    }

    pub async fn current_table(&self) -> UseCaseResult<RateTable> {
        let now = Utc::now();

        if let Some(table) = self.cache.fresh_snapshot(now).await {
            debug!(fetched_at = %table.fetched_at, "rates: serving cached table");
            return Ok(table);
        }

        info!("rates: cache stale or empty, refreshing from upstreams");
        let (usd_rates, usdc_usd_rate) = tokio::try_join!(
            self.rate_gateway.fetch_fiat_rates(),
            self.rate_gateway.fetch_usdc_rate(),
        )
        .map_err(|err| {
            error!(error = ?err, "rates: refresh failed");
            RateError::Unavailable
        })?;

        let table = RateTable {
            usd_rates,
            usdc_usd_rate,
            fetched_at: now,
        };
        self.cache.store(table.clone()).await;

        info!(
            rate_count = table.usd_rates.len(),
            usdc_usd_rate = table.usdc_usd_rate,
            "rates: table refreshed"
        );

        Ok(table)
    }

    /// Converts a typed amount into USDC. Amounts already in USDC pass
    /// through without touching the rate table.
    pub async fn convert_to_usdc(&self, amount: f64, currency_code: &str) -> UseCaseResult<f64> {
        if currency_code == "USDC" {
            return Ok(amount);
        }

        let table = self.current_table().await?;
        table.to_usdc(amount, currency_code).ok_or_else(|| {
            error!(currency_code, "rates: no cached rate for currency");
            RateError::Unavailable
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway_with_rates() -> MockRateGateway {
        let mut gateway = MockRateGateway::new();
        gateway.expect_fetch_fiat_rates().times(1).returning(|| {
            Box::pin(async {
                Ok(HashMap::from([
                    ("USD".to_string(), 1.0),
                    ("UGX".to_string(), 3750.0),
                ]))
            })
        });
        gateway
            .expect_fetch_usdc_rate()
            .times(1)
            .returning(|| Box::pin(async { Ok(1.0) }));
        gateway
    }

    #[tokio::test]
    async fn refreshes_once_then_serves_from_cache() {
        let usecase = RateUseCase::new(Arc::new(gateway_with_rates()), Arc::new(RateCache::new()));

        let first = usecase.current_table().await.unwrap();
        // Second call must hit the cache; the mock only allows one fetch.
        let second = usecase.current_table().await.unwrap();

        assert_eq!(first.fetched_at, second.fetched_at);
        assert_eq!(second.usd_rates.get("UGX"), Some(&3750.0));
    }

    #[tokio::test]
    async fn failed_refresh_reports_unavailable() {
        let mut gateway = MockRateGateway::new();
        gateway
            .expect_fetch_fiat_rates()
            .returning(|| Box::pin(async { Err(anyhow::anyhow!("upstream down")) }));
        gateway
            .expect_fetch_usdc_rate()
            .returning(|| Box::pin(async { Ok(1.0) }));

        let usecase = RateUseCase::new(Arc::new(gateway), Arc::new(RateCache::new()));

        let result = usecase.current_table().await;
        assert!(matches!(result, Err(RateError::Unavailable)));
    }

    #[tokio::test]
    async fn converts_local_currency_through_the_table() {
        let usecase = RateUseCase::new(Arc::new(gateway_with_rates()), Arc::new(RateCache::new()));

        let usdc = usecase.convert_to_usdc(7500.0, "UGX").await.unwrap();
        assert!((usdc - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn usdc_amounts_pass_through_without_rates() {
        // No gateway expectations: a USDC amount must not trigger a fetch.
        let usecase = RateUseCase::new(
            Arc::new(MockRateGateway::new()),
            Arc::new(RateCache::new()),
        );

        let usdc = usecase.convert_to_usdc(42.5, "USDC").await.unwrap();
        assert_eq!(usdc, 42.5);
    }

    #[tokio::test]
    async fn unknown_currency_is_unavailable() {
        let usecase = RateUseCase::new(Arc::new(gateway_with_rates()), Arc::new(RateCache::new()));

        let result = usecase.convert_to_usdc(10.0, "XXX").await;
        assert!(matches!(result, Err(RateError::Unavailable)));
    }
}
