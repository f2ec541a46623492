#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub merchant_auth: MerchantAuth,
    pub payments: Payments,
    pub rates: Rates,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct MerchantAuth {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct Payments {
    /// Public origin that payment links embed, e.g. `https://payne.example`.
    pub pay_base_url: String,
    pub chain_rpc_url: String,
    pub usdc_token_address: String,
    pub chain_id: u64,
    pub receipt_poll_interval_ms: u64,
    pub receipt_poll_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Rates {
    pub exchange_rate_api_key: String,
}
