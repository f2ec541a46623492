use crate::axum_http::error_responses::usecase_error;
use crate::usecases::payments::{AlertSink, ChainGateway, PaymentUseCase};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    chain::evm_client::EvmRpcClient,
    domain::{
        repositories::invoices::InvoiceRepository, value_objects::payments::PayInvoiceModel,
    },
    infra::db::{postgres::postgres_connection::PgPool, repositories::invoices::InvoicePostgres},
    observability::alerts::OpsAlerts,
};
use serde::Serialize;
use std::sync::Arc;

pub fn routes(
    db_pool: Arc<PgPool>,
    chain_client: Arc<EvmRpcClient>,
    alerts: Arc<OpsAlerts>,
) -> Router {
    let invoices_repository = InvoicePostgres::new(Arc::clone(&db_pool));
    let payments_usecase =
        PaymentUseCase::new(Arc::new(invoices_repository), chain_client, alerts);

    Router::new()
        .route("/:invoice_number", post(pay_invoice))
        .route("/balance/:account", get(payer_balance))
        .with_state(Arc::new(payments_usecase))
}

pub async fn pay_invoice<R, C, A>(
    State(payments_usecase): State<Arc<PaymentUseCase<R, C, A>>>,
    Path(invoice_number): Path<String>,
    Json(model): Json<PayInvoiceModel>,
) -> impl IntoResponse
where
    R: InvoiceRepository + Send + Sync + 'static,
    C: ChainGateway + Send + Sync + 'static,
    A: AlertSink + Send + Sync + 'static,
{
    match payments_usecase.pay_invoice(&invoice_number, model).await {
        Ok(confirmation) => (StatusCode::OK, Json(confirmation)).into_response(),
        Err(err) => usecase_error(err.status_code(), err),
    }
}

#[derive(Debug, Serialize)]
struct BalanceResponse {
    account: String,
    balance: f64,
}

pub async fn payer_balance<R, C, A>(
    State(payments_usecase): State<Arc<PaymentUseCase<R, C, A>>>,
    Path(account): Path<String>,
) -> impl IntoResponse
where
    R: InvoiceRepository + Send + Sync + 'static,
    C: ChainGateway + Send + Sync + 'static,
    A: AlertSink + Send + Sync + 'static,
{
    match payments_usecase.payer_balance(&account).await {
        Ok(balance) => (StatusCode::OK, Json(BalanceResponse { account, balance })).into_response(),
        Err(err) => usecase_error(err.status_code(), err),
    }
}
