pub mod chain;
pub mod domain;
pub mod geo;
pub mod infra;
pub mod observability;
pub mod rates;
