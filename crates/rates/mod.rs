pub mod rate_cache;
pub mod rate_client;
