use axum::{
    extract::{Query, State},
    Extension, Json,
};
use dealproxy_pipeline::DealsResponse;
use serde::Deserialize;

use super::{ApiError, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct DealsQuery {
    currency: Option<String>,
}

/// Never fails on upstream trouble: a missing or stale entry is served as-is
/// while a refresh runs in the background.
pub(super) async fn list_deals(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<DealsQuery>,
) -> Result<Json<DealsResponse>, ApiError> {
    let currency = query
        .currency
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(&state.default_currency);

    if !state.service.is_tracked(currency) {
        return Err(ApiError::new(
            req_id.0,
            "unsupported_currency",
            format!("currency \"{currency}\" is not tracked"),
        ));
    }

    Ok(Json(state.service.get_deals(currency).await))
}
