//! Shipping quote endpoint.

use axum::{extract::State, Json};

use crate::error::Result;
use crate::shipping::{QuoteRequest, ShippingQuote};
use crate::state::AppState;

/// Returns ranked shipping options; carrier downtime is absorbed by the
/// contingency table so this only fails on a missing or malformed CEP.
pub async fn quote_shipping(
    State(s): State<AppState>,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<Vec<ShippingQuote>>> {
    Ok(Json(s.shipping.resolve(&req).await?))
}
