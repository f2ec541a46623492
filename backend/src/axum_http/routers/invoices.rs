use crate::auth::AuthMerchant;
use crate::axum_http::error_responses::usecase_error;
use crate::usecases::{
    invoices::{InvoiceUseCase, MerchantContext},
    rates::{RateGateway, RateUseCase},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::{
        repositories::invoices::InvoiceRepository,
        value_objects::invoices::{CreateInvoiceModel, InvoiceListFilter},
    },
    infra::db::{postgres::postgres_connection::PgPool, repositories::invoices::InvoicePostgres},
    rates::rate_client::RateClient,
};
use std::sync::Arc;

pub fn routes(
    db_pool: Arc<PgPool>,
    rates: Arc<RateUseCase<RateClient>>,
    pay_base_url: String,
) -> Router {
    let invoices_repository = InvoicePostgres::new(Arc::clone(&db_pool));
    let invoices_usecase =
        InvoiceUseCase::new(Arc::new(invoices_repository), rates, pay_base_url);

    Router::new()
        .route("/", post(create_invoice).get(list_invoices))
        .route("/recent", get(dashboard_summary))
        .route("/:invoice_number", get(get_by_number))
        .with_state(Arc::new(invoices_usecase))
}

pub async fn create_invoice<R, G>(
    State(invoices_usecase): State<Arc<InvoiceUseCase<R, G>>>,
    auth: AuthMerchant,
    Json(model): Json<CreateInvoiceModel>,
) -> impl IntoResponse
where
    R: InvoiceRepository + Send + Sync + 'static,
    G: RateGateway + Send + Sync + 'static,
{
    let merchant = MerchantContext {
        merchant_id: auth.merchant_id,
        display_name: auth.display_name,
    };

    match invoices_usecase.create_invoice(merchant, model).await {
        Ok(invoice) => (StatusCode::CREATED, Json(invoice)).into_response(),
        Err(err) => usecase_error(err.status_code(), err),
    }
}

pub async fn list_invoices<R, G>(
    State(invoices_usecase): State<Arc<InvoiceUseCase<R, G>>>,
    auth: AuthMerchant,
    Query(filter): Query<InvoiceListFilter>,
) -> impl IntoResponse
where
    R: InvoiceRepository + Send + Sync + 'static,
    G: RateGateway + Send + Sync + 'static,
{
    match invoices_usecase
        .list_invoices(auth.merchant_id, filter)
        .await
    {
        Ok(invoices) => (StatusCode::OK, Json(invoices)).into_response(),
        Err(err) => usecase_error(err.status_code(), err),
    }
}

pub async fn dashboard_summary<R, G>(
    State(invoices_usecase): State<Arc<InvoiceUseCase<R, G>>>,
    auth: AuthMerchant,
) -> impl IntoResponse
where
    R: InvoiceRepository + Send + Sync + 'static,
    G: RateGateway + Send + Sync + 'static,
{
    match invoices_usecase.dashboard_summary(auth.merchant_id).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => usecase_error(err.status_code(), err),
    }
}

/// Public: the payment page loads invoice details by number without auth.
pub async fn get_by_number<R, G>(
    State(invoices_usecase): State<Arc<InvoiceUseCase<R, G>>>,
    Path(invoice_number): Path<String>,
) -> impl IntoResponse
where
    R: InvoiceRepository + Send + Sync + 'static,
    G: RateGateway + Send + Sync + 'static,
{
    match invoices_usecase.get_by_number(&invoice_number).await {
        Ok(invoice) => (StatusCode::OK, Json(invoice)).into_response(),
        Err(err) => usecase_error(err.status_code(), err),
    }
}
