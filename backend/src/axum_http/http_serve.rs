use crate::{
    axum_http::{default_routers, routers},
    config::config_model::DotEnvyConfig,
};
use anyhow::Result;
use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use crates::{
    chain::evm_client::EvmRpcClient,
    geo::geo_client::GeoClient,
    infra,
    observability::alerts::OpsAlerts,
    rates::{rate_cache::RateCache, rate_client::RateClient},
};
use infra::db::postgres::postgres_connection::PgPool;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::usecases::{preferences::PreferenceUseCase, rates::RateUseCase};

pub async fn start(
    config: Arc<DotEnvyConfig>,
    db_pool: Arc<PgPool>,
    ops_alerts: OpsAlerts,
) -> Result<()> {
    let rate_client = Arc::new(RateClient::new(config.rates.exchange_rate_api_key.clone()));
    let rates_usecase = Arc::new(RateUseCase::new(rate_client, Arc::new(RateCache::new())));

    let chain_client = Arc::new(EvmRpcClient::new(
        config.payments.chain_rpc_url.clone(),
        config.payments.usdc_token_address.clone(),
        Duration::from_millis(config.payments.receipt_poll_interval_ms),
        Duration::from_millis(config.payments.receipt_poll_timeout_ms),
    ));

    // Surface chain misconfiguration at startup instead of on the first payment.
    match chain_client.chain_id().await {
        Ok(chain_id) if chain_id == config.payments.chain_id => {
            info!(chain_id, "Chain RPC endpoint verified");
        }
        Ok(chain_id) => {
            warn!(
                expected = config.payments.chain_id,
                actual = chain_id,
                "Chain RPC reports an unexpected chain id"
            );
        }
        Err(err) => {
            warn!(error = ?err, "Chain RPC endpoint is unreachable at startup");
        }
    }

    let preferences_usecase = Arc::new(PreferenceUseCase::new(Arc::new(GeoClient::new())));

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api/v1/invoices",
            routers::invoices::routes(
                Arc::clone(&db_pool),
                Arc::clone(&rates_usecase),
                config.payments.pay_base_url.clone(),
            ),
        )
        .nest(
            "/api/v1/pay",
            routers::payments::routes(
                Arc::clone(&db_pool),
                Arc::clone(&chain_client),
                Arc::new(ops_alerts),
            ),
        )
        .nest(
            "/api/v1/analytics",
            routers::analytics::routes(Arc::clone(&db_pool)),
        )
        .nest(
            "/api/v1/rates",
            routers::rates::routes(Arc::clone(&rates_usecase)),
        )
        .nest(
            "/api/v1/preferences",
            routers::preferences::routes(Arc::clone(&preferences_usecase)),
        )
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(TimeoutLayer::new(Duration::from_secs(config.server.timeout)))
        .layer(RequestBodyLimitLayer::new(
            (config.server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any), // TODO Add the domain later
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
    };

    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
