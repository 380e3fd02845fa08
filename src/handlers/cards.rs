//! Card HTTP handlers.
//!
//! - GET /api/v1/cards/:id - Card details (never the PIN hash)
//! - POST /api/v1/cards/:id/activate - Set the first PIN and activate
//! - POST /api/v1/cards/:id/pin - Change the PIN

use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{
    error::LedgerError,
    handlers::AppState,
    models::card::{ActivateCardRequest, CardResponse, ChangePinRequest},
};

pub async fn get_card(
    State(engine): State<AppState>,
    Path(card_id): Path<Uuid>,
) -> Result<Json<CardResponse>, LedgerError> {
    Ok(Json(engine.get_card(card_id).await?))
}

/// Activate a card.
///
/// # Request Body
///
/// ```json
/// { "pin": "1234" }
/// ```
///
/// The PIN must be 4 to 6 digits. An active card answers 409.
pub async fn activate_card(
    State(engine): State<AppState>,
    Path(card_id): Path<Uuid>,
    Json(request): Json<ActivateCardRequest>,
) -> Result<Json<CardResponse>, LedgerError> {
    let card = engine.activate_card(card_id, request.pin.expose()).await?;
    Ok(Json(card))
}

/// Change the PIN of a card.
///
/// # Request Body
///
/// ```json
/// { "old_pin": "1234", "new_pin": "5678" }
/// ```
pub async fn change_pin(
    State(engine): State<AppState>,
    Path(card_id): Path<Uuid>,
    Json(request): Json<ChangePinRequest>,
) -> Result<Json<CardResponse>, LedgerError> {
    let card = engine
        .change_card_pin(card_id, request.old_pin.expose(), request.new_pin.expose())
        .await?;
    Ok(Json(card))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use uuid::Uuid;

    use crate::handlers::test_support::{app, json_body, send};
    use crate::models::card::CardType;
    use crate::services::testing::Fixture;

    #[tokio::test]
    async fn activate_then_fetch() {
        let fx = Fixture::new();
        let account = fx.account(fx.bank(None), 0);
        let card_id = fx.card_without_pin(account.id, CardType::Credit, 100_000);

        let response = send(
            app(&fx),
            Method::POST,
            &format!("/api/v1/cards/{card_id}/activate"),
            Some(json!({ "pin": "2468" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(app(&fx), Method::GET, &format!("/api/v1/cards/{card_id}"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["is_activated"], true);
        assert_eq!(body["card_type"], "CREDIT");
        assert!(body.get("pin_hash").is_none());
    }

    #[tokio::test]
    async fn short_pin_is_bad_request() {
        let fx = Fixture::new();
        let account = fx.account(fx.bank(None), 0);
        let card_id = fx.card_without_pin(account.id, CardType::Debit, 100_000);

        let response = send(
            app(&fx),
            Method::POST,
            &format!("/api/v1/cards/{card_id}/activate"),
            Some(json!({ "pin": "12" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn activating_active_card_is_conflict() {
        let fx = Fixture::new();
        let account = fx.account(fx.bank(None), 0);
        let card_id = fx.card(account.id, CardType::Debit, 100_000, "1234", true);

        let response = send(
            app(&fx),
            Method::POST,
            &format!("/api/v1/cards/{card_id}/activate"),
            Some(json!({ "pin": "9999" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "card_already_activated");
    }

    #[tokio::test]
    async fn change_pin_with_wrong_old_pin_is_unauthorized() {
        let fx = Fixture::new();
        let account = fx.account(fx.bank(None), 0);
        let card_id = fx.card(account.id, CardType::Debit, 100_000, "1234", true);

        let response = send(
            app(&fx),
            Method::POST,
            &format!("/api/v1/cards/{card_id}/pin"),
            Some(json!({ "old_pin": "0000", "new_pin": "5678" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_card_is_not_found() {
        let fx = Fixture::new();
        let response = send(
            app(&fx),
            Method::GET,
            &format!("/api/v1/cards/{}", Uuid::new_v4()),
            None,
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "card_not_found");
    }
}
