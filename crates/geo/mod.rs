pub mod country_currency;
pub mod geo_client;
