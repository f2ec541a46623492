use crate::axum_http::error_responses::usecase_error;
use crate::usecases::rates::{RateGateway, RateUseCase};
use axum::{
    Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get,
};
use crates::rates::rate_client::RateClient;
use std::sync::Arc;

pub fn routes(rates_usecase: Arc<RateUseCase<RateClient>>) -> Router {
    Router::new()
        .route("/", get(current_rates))
        .with_state(rates_usecase)
}

/// Public: the payment page converts displayed amounts without auth.
pub async fn current_rates<G>(
    State(rates_usecase): State<Arc<RateUseCase<G>>>,
) -> impl IntoResponse
where
    G: RateGateway + Send + Sync + 'static,
{
    match rates_usecase.current_table().await {
        Ok(table) => (StatusCode::OK, Json(table)).into_response(),
        Err(err) => usecase_error(err.status_code(), err),
    }
}
