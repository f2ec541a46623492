use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Rate snapshots are reusable for one hour, then must be refetched.
pub fn cache_window() -> Duration {
    Duration::hours(1)
}

/// Session-scoped display preference resolved from geolocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrencyPreference {
    pub country: String,
    pub country_code: String,
    pub currency_code: String,
    pub flag: Option<String>,
}

impl CurrencyPreference {
    pub fn usd_default() -> Self {
        Self {
            country: String::new(),
            country_code: String::new(),
            currency_code: "USD".to_string(),
            flag: None,
        }
    }
}

/// One fetch of both upstreams: fiat rates quoted as units per 1 USD, and the
/// USD price of 1 USDC. Conversions are plain f64 arithmetic; rounding happens
/// only at render time, never before persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateTable {
    pub usd_rates: HashMap<String, f64>,
    pub usdc_usd_rate: f64,
    pub fetched_at: DateTime<Utc>,
}

impl RateTable {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.fetched_at < cache_window()
    }

    fn rate(&self, currency_code: &str) -> Option<f64> {
        self.usd_rates.get(currency_code).copied()
    }

    /// `None` means no rate is cached for the currency; the caller must show
    /// a placeholder rather than a wrong number.
    pub fn to_usd(&self, amount: f64, currency_code: &str) -> Option<f64> {
        self.rate(currency_code).map(|rate| amount / rate)
    }

    pub fn from_usd(&self, amount: f64, currency_code: &str) -> Option<f64> {
        self.rate(currency_code).map(|rate| amount * rate)
    }

    pub fn to_usdc(&self, amount: f64, currency_code: &str) -> Option<f64> {
        self.to_usd(amount, currency_code)
            .map(|usd| usd / self.usdc_usd_rate)
    }

    pub fn from_usdc(&self, amount: f64, currency_code: &str) -> Option<f64> {
        self.from_usd(amount * self.usdc_usd_rate, currency_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table(fetched_at: DateTime<Utc>) -> RateTable {
        let mut usd_rates = HashMap::new();
        usd_rates.insert("USD".to_string(), 1.0);
        usd_rates.insert("UGX".to_string(), 3750.0);
        usd_rates.insert("EUR".to_string(), 0.92);
        RateTable {
            usd_rates,
            usdc_usd_rate: 0.9998,
            fetched_at,
        }
    }

    #[test]
    fn converts_between_usd_and_local_currency() {
        let table = sample_table(Utc::now());
        assert_eq!(table.to_usd(3750.0, "UGX"), Some(1.0));
        assert_eq!(table.from_usd(2.0, "UGX"), Some(7500.0));
    }

    #[test]
    fn usdc_round_trip_is_stable() {
        let table = sample_table(Utc::now());
        for amount in [0.01_f64, 1.0, 42.5, 125_000.0] {
            let through = table
                .to_usdc(table.from_usdc(amount, "UGX").unwrap(), "UGX")
                .unwrap();
            assert!((through - amount).abs() < 1e-9 * amount.max(1.0));
        }
    }

    #[test]
    fn missing_rate_is_unavailable_in_both_directions() {
        let table = sample_table(Utc::now());
        assert_eq!(table.to_usdc(10.0, "XXX"), None);
        assert_eq!(table.from_usdc(10.0, "XXX"), None);
        assert_eq!(table.to_usd(10.0, "XXX"), None);
        assert_eq!(table.from_usd(10.0, "XXX"), None);
    }

    #[test]
    fn freshness_window_is_one_hour() {
        let fetched_at = Utc::now();
        let table = sample_table(fetched_at);

        assert!(table.is_fresh(fetched_at + Duration::minutes(59)));
        assert!(!table.is_fresh(fetched_at + Duration::hours(1)));
        assert!(!table.is_fresh(fetched_at + Duration::hours(1) + Duration::seconds(1)));
    }
}
