use crate::auth::AuthMerchant;
use crate::axum_http::error_responses::usecase_error;
use crate::usecases::analytics::AnalyticsUseCase;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::NaiveDate;
use crates::{
    domain::repositories::invoices::InvoiceRepository,
    infra::db::{postgres::postgres_connection::PgPool, repositories::invoices::InvoicePostgres},
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes(db_pool: Arc<PgPool>) -> Router {
    let invoices_repository = InvoicePostgres::new(Arc::clone(&db_pool));
    let analytics_usecase = AnalyticsUseCase::new(Arc::new(invoices_repository));

    Router::new()
        .route("/", get(report))
        .with_state(Arc::new(analytics_usecase))
}

fn default_range() -> String {
    "last30days".to_string()
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(default = "default_range")]
    pub range: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

pub async fn report<R>(
    State(analytics_usecase): State<Arc<AnalyticsUseCase<R>>>,
    _auth: AuthMerchant,
    Query(query): Query<AnalyticsQuery>,
) -> impl IntoResponse
where
    R: InvoiceRepository + Send + Sync + 'static,
{
    match analytics_usecase
        .report(&query.range, query.start, query.end)
        .await
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => usecase_error(err.status_code(), err),
    }
}
