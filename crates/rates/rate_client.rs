use std::collections::HashMap;

use anyhow::Result;
use serde::Deserialize;
use tracing::error;

const FIAT_RATE_ENDPOINT: &str = "https://v6.exchangerate-api.com/v6";
const USDC_PRICE_ENDPOINT: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=usd-coin&vs_currencies=usd";

/// Client for the two rate upstreams: the fiat table (units per 1 USD) and
/// the USDC spot price in USD.
pub struct RateClient {
    http: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct FiatRateResponse {
    result: String,
    conversion_rates: Option<HashMap<String, f64>>,
}

#[derive(Debug, Deserialize)]
struct UsdcPriceResponse {
    #[serde(rename = "usd-coin")]
    usd_coin: Option<UsdcPrice>,
}

#[derive(Debug, Deserialize)]
struct UsdcPrice {
    usd: Option<f64>,
}

impl RateClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        error!(
            status = %status,
            response_body = %body,
            context = %context,
            "rate api request failed"
        );

        anyhow::bail!("rate API request failed: {} (status {})", context, status);
    }

    /// Fetches the fiat conversion table relative to USD.
    pub async fn fetch_fiat_rates(&self) -> Result<HashMap<String, f64>> {
        let url = format!("{}/{}/latest/USD", FIAT_RATE_ENDPOINT, self.api_key);
        let resp = self.http.get(url).send().await?;
        let resp = Self::ensure_success(resp, "fetch fiat rates").await?;

        let parsed: FiatRateResponse = resp.json().await?;
        if parsed.result != "success" {
            anyhow::bail!("exchange rate API returned unsuccessful response");
        }

        parsed
            .conversion_rates
            .ok_or_else(|| anyhow::anyhow!("exchange rate response missing conversion_rates"))
    }

    /// Fetches the USD price of 1 USDC.
    pub async fn fetch_usdc_rate(&self) -> Result<f64> {
        let resp = self.http.get(USDC_PRICE_ENDPOINT).send().await?;
        let resp = Self::ensure_success(resp, "fetch usdc rate").await?;

        let parsed: UsdcPriceResponse = resp.json().await?;
        parsed
            .usd_coin
            .and_then(|price| price.usd)
            .ok_or_else(|| anyhow::anyhow!("invalid USDC rate response format"))
    }
}
