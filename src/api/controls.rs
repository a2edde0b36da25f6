//! Trading control handlers.

use crate::controls::SymbolControl;
use crate::error::{ApiError, ErrorResponse};
use crate::market::Commodity;
use crate::models::{ControlEntry, ControlsResponse, UpdateControlRequest};
use crate::state::AppState;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use std::sync::Arc;

#[cfg(test)]
mod tests;

/// List trading controls for every commodity.
#[utoipa::path(
    get,
    path = "/api/v1/controls",
    responses(
        (status = 200, description = "Current controls", body = ControlsResponse)
    ),
    tag = "Controls"
)]
pub async fn get_controls(State(state): State<Arc<AppState>>) -> Json<ControlsResponse> {
    let controls = state
        .service
        .controls()
        .all()
        .into_iter()
        .map(|(symbol, control)| ControlEntry::new(symbol, control))
        .collect();

    Json(ControlsResponse { controls })
}

/// Replace the trading control of one commodity.
#[utoipa::path(
    put,
    path = "/api/v1/controls/{symbol}",
    params(
        ("symbol" = String, Path, description = "Commodity symbol")
    ),
    request_body = UpdateControlRequest,
    responses(
        (status = 200, description = "Control updated", body = ControlEntry),
        (status = 400, description = "Invalid symbol or limit", body = ErrorResponse)
    ),
    tag = "Controls"
)]
pub async fn update_control(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    body: Result<Json<UpdateControlRequest>, JsonRejection>,
) -> Result<Json<ControlEntry>, ApiError> {
    let Json(body) = body?;
    let commodity: Commodity = symbol.parse()?;

    if let Some(max) = body.max_order_quantity
        && (!max.is_finite() || max <= 0.0)
    {
        return Err(ApiError::InvalidRequest(format!(
            "max_order_quantity must be positive, got {}",
            max
        )));
    }

    let control = SymbolControl {
        enabled: body.enabled,
        max_order_quantity: body.max_order_quantity,
    };
    state.service.controls().set(commodity, control);

    Ok(Json(ControlEntry::new(commodity, control)))
}
