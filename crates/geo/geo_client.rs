use anyhow::Result;
use serde::Deserialize;
use tracing::error;

const GEO_ENDPOINT: &str = "http://ip-api.com/json";
// status + country + countryCode + currency + query, per the ip-api field
// bitmask documentation.
const GEO_FIELDS: &str = "8413187";
const USER_AGENT: &str = "Payne App/1.0";

/// Fallback probe IP used when the caller arrives over loopback, so local
/// development still resolves to a real country.
pub const LOOPBACK_PROBE_IP: &str = "8.8.8.8";

pub struct GeoClient {
    http: reqwest::Client,
}

#[derive(Debug, Clone)]
pub struct GeoInfo {
    pub country: String,
    pub country_code: String,
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    status: Option<String>,
    country: Option<String>,
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
}

/// Replaces loopback with the public probe IP; anything else passes through.
pub fn probe_ip(raw_ip: &str) -> &str {
    match raw_ip {
        "127.0.0.1" | "::1" | "" => LOOPBACK_PROBE_IP,
        other => other,
    }
}

impl GeoClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    pub async fn lookup(&self, ip: &str) -> Result<GeoInfo> {
        let url = format!("{}/{}?fields={}", GEO_ENDPOINT, probe_ip(ip), GEO_FIELDS);
        let resp = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            error!(%status, ip, "geo api request failed");
            anyhow::bail!("geo API request failed (status {})", status);
        }

        let parsed: GeoResponse = resp.json().await?;

        if parsed.status.as_deref() != Some("success") {
            anyhow::bail!("geo API returned unsuccessful response for {}", ip);
        }

        let country = parsed
            .country
            .ok_or_else(|| anyhow::anyhow!("geo response missing country"))?;
        let country_code = parsed
            .country_code
            .ok_or_else(|| anyhow::anyhow!("geo response missing country code"))?;

        Ok(GeoInfo {
            country,
            country_code,
        })
    }
}

impl Default for GeoClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the flag emoji for an ISO 3166 alpha-2 code out of regional
/// indicator symbols. Returns `None` for anything that is not two ASCII
/// letters.
pub fn flag_emoji(country_code: &str) -> Option<String> {
    let code = country_code.trim().to_ascii_uppercase();
    if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }

    code.chars()
        .map(|c| char::from_u32(0x1F1E6 + (c as u32 - 'A' as u32)))
        .collect::<Option<String>>()
}
