use crate::config::{config_model::MerchantAuth, stage::Stage};
use anyhow::{Ok, Result};

use super::config_model::DotEnvyConfig;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = super::config_model::Server {
        port: std::env::var("SERVER_PORT")
            .expect("SERVER_PORT is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = super::config_model::Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let merchant_auth = super::config_model::MerchantAuth {
        jwt_secret: std::env::var("JWT_MERCHANT_SECRET").expect("JWT_MERCHANT_SECRET is invalid"),
    };

    let payments = super::config_model::Payments {
        pay_base_url: std::env::var("PAY_BASE_URL").expect("PAY_BASE_URL is invalid"),
        chain_rpc_url: std::env::var("CHAIN_RPC_URL").expect("CHAIN_RPC_URL is invalid"),
        usdc_token_address: std::env::var("USDC_TOKEN_ADDRESS")
            .expect("USDC_TOKEN_ADDRESS is invalid"),
        chain_id: std::env::var("CHAIN_ID").expect("CHAIN_ID is invalid").parse()?,
        receipt_poll_interval_ms: std::env::var("RECEIPT_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "2000".to_string())
            .parse()?,
        receipt_poll_timeout_ms: std::env::var("RECEIPT_POLL_TIMEOUT_MS")
            .unwrap_or_else(|_| "120000".to_string())
            .parse()?,
    };

    let rates = super::config_model::Rates {
        exchange_rate_api_key: std::env::var("EXCHANGE_RATE_API_KEY")
            .expect("EXCHANGE_RATE_API_KEY is invalid"),
    };

    Ok(DotEnvyConfig {
        server,
        database,
        merchant_auth,
        payments,
        rates,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or("".to_string());
    Stage::try_from(&stage_str).unwrap_or_default()
}

pub fn get_merchant_secret() -> Result<MerchantAuth> {
    dotenvy::dotenv().ok();

    Ok(MerchantAuth {
        jwt_secret: std::env::var("JWT_MERCHANT_SECRET").expect("JWT_MERCHANT_SECRET is invalid"),
    })
}
