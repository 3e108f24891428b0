use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use super::AppState;

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
    ready: bool,
    stores: usize,
    currencies: Vec<CurrencyHealth>,
}

#[derive(Debug, Serialize)]
struct CurrencyHealth {
    currency: String,
    count: usize,
    age_secs: Option<u64>,
}

/// 200 once pre-warm has finished, 503 while it is still running.
pub(super) async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.service.status().await;
    let (code, label) = if status.ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "warming")
    };

    let body = HealthData {
        status: label,
        ready: status.ready,
        stores: status.stores,
        currencies: status
            .currencies
            .into_iter()
            .map(|c| CurrencyHealth {
                currency: c.currency,
                count: c.count,
                age_secs: c.age_secs,
            })
            .collect(),
    };
    (code, Json(body))
}
