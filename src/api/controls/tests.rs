//! Unit tests for controls handlers.

use super::*;
use crate::error::MarketError;

fn state() -> Arc<AppState> {
    Arc::new(AppState::new())
}

// ============================================================================
// ControlsResponse Tests
// ============================================================================

#[test]
fn test_controls_response_serialization() {
    let response = ControlsResponse {
        controls: vec![ControlEntry {
            symbol: Commodity::Wheat,
            enabled: false,
            max_order_quantity: Some(250.0),
        }],
    };

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"symbol\":\"WHEAT\""));
    assert!(json.contains("\"enabled\":false"));
    assert!(json.contains("\"max_order_quantity\":250.0"));
}

// ============================================================================
// Handler Tests
// ============================================================================

#[tokio::test]
async fn test_get_controls_lists_every_symbol() {
    let Json(response) = get_controls(State(state())).await;
    assert_eq!(response.controls.len(), Commodity::ALL.len());
    assert!(response.controls.iter().all(|c| c.enabled));
    assert!(response.controls.iter().all(|c| c.max_order_quantity.is_none()));
}

#[tokio::test]
async fn test_update_control() {
    let state = state();
    let Json(entry) = update_control(
        State(state.clone()),
        Path("copper".to_string()),
        Ok(Json(UpdateControlRequest {
            enabled: false,
            max_order_quantity: Some(40.0),
        })),
    )
    .await
    .unwrap();

    assert_eq!(entry.symbol, Commodity::Copper);
    assert!(!entry.enabled);

    let control = state.service.controls().get(Commodity::Copper);
    assert!(!control.enabled);
    assert_eq!(control.max_order_quantity, Some(40.0));
}

#[tokio::test]
async fn test_update_control_unknown_symbol() {
    let result = update_control(
        State(state()),
        Path("URANIUM".to_string()),
        Ok(Json(UpdateControlRequest {
            enabled: true,
            max_order_quantity: None,
        })),
    )
    .await;

    assert!(matches!(
        result,
        Err(ApiError::Market(MarketError::InvalidSymbol(_)))
    ));
}

#[tokio::test]
async fn test_update_control_rejects_non_positive_limit() {
    let state = state();
    let result = update_control(
        State(state.clone()),
        Path("GOLD".to_string()),
        Ok(Json(UpdateControlRequest {
            enabled: true,
            max_order_quantity: Some(0.0),
        })),
    )
    .await;

    assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    assert_eq!(
        state.service.controls().get(Commodity::Gold),
        SymbolControl::default()
    );
}
