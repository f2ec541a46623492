use crate::usecases::preferences::{GeoGateway, PreferenceUseCase};
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use crates::geo::geo_client::GeoClient;
use std::sync::Arc;

pub fn routes(preferences_usecase: Arc<PreferenceUseCase<GeoClient>>) -> Router {
    Router::new()
        .route("/", get(resolve_preference))
        .with_state(preferences_usecase)
}

/// First forwarded hop, then the reverse-proxy header; an absent or
/// loopback address is mapped to the public probe IP downstream.
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
                .map(|value| value.trim().to_string())
        })
        .unwrap_or_default()
}

pub async fn resolve_preference<G>(
    State(preferences_usecase): State<Arc<PreferenceUseCase<G>>>,
    headers: HeaderMap,
) -> impl IntoResponse
where
    G: GeoGateway + Send + Sync + 'static,
{
    let ip = client_ip(&headers);
    let preference = preferences_usecase.resolve(&ip).await;
    (StatusCode::OK, Json(preference)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn prefers_the_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));

        assert_eq!(client_ip(&headers), "203.0.113.9");
    }

    #[test]
    fn falls_back_to_real_ip_then_empty() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_ip(&headers), "10.0.0.2");

        assert_eq!(client_ip(&HeaderMap::new()), "");
    }
}
