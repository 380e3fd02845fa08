//! Card data model.
//!
//! This module defines:
//! - `Card`: the stored card record, including its PIN hash
//! - `CardType`: debit, credit, or whatever else the record store holds
//! - `CardResponse`: the card as shown to clients (no PIN material)
//! - `Pin`: a PIN received from a client, redacted from debug output
//! - Request bodies for activation and PIN change

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of card, which decides how withdrawal limits are checked.
///
/// Stored as text. Values other than `DEBIT` and `CREDIT` are kept as
/// `Other` so that the engine can reject them explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CardType {
    Debit,
    Credit,
    Other(String),
}

impl From<String> for CardType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "DEBIT" => CardType::Debit,
            "CREDIT" => CardType::Credit,
            _ => CardType::Other(value),
        }
    }
}

impl From<CardType> for String {
    fn from(card_type: CardType) -> Self {
        card_type.to_string()
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardType::Debit => f.write_str("DEBIT"),
            CardType::Credit => f.write_str("CREDIT"),
            CardType::Other(other) => f.write_str(other),
        }
    }
}

/// Represents a card record.
///
/// # PIN Storage
///
/// `pin_hash` holds a salted one-way hash produced by the configured
/// `PinHasher`. It is never serialized and `Debug` output redacts it.
/// Cards that were never activated may have no hash at all.
#[derive(Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,

    /// Account this card draws on
    pub account_id: Uuid,

    #[sqlx(try_from = "String")]
    pub card_type: CardType,

    /// Withdrawal ceiling in minor units; for credit cards also the credit line
    pub withdrawal_limit_cents: i64,

    /// Only activated cards can authenticate
    pub is_activated: bool,

    #[serde(skip_serializing, default)]
    pub pin_hash: Option<String>,
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Card")
            .field("id", &self.id)
            .field("account_id", &self.account_id)
            .field("card_type", &self.card_type)
            .field("withdrawal_limit_cents", &self.withdrawal_limit_cents)
            .field("is_activated", &self.is_activated)
            .field("pin_hash", &self.pin_hash.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Card as returned to API clients.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "123e4567-e89b-12d3-a456-426614174000",
///   "account_id": "550e8400-e29b-41d4-a716-446655440000",
///   "card_type": "CREDIT",
///   "withdrawal_limit_cents": 100000,
///   "is_activated": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardResponse {
    pub id: Uuid,
    pub account_id: Uuid,
    pub card_type: CardType,
    pub withdrawal_limit_cents: i64,
    pub is_activated: bool,
}

/// Drops the PIN hash.
impl From<Card> for CardResponse {
    fn from(card: Card) -> Self {
        Self {
            id: card.id,
            account_id: card.account_id,
            card_type: card.card_type,
            withdrawal_limit_cents: card.withdrawal_limit_cents,
            is_activated: card.is_activated,
        }
    }
}

/// A PIN as received from a client.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Pin(String);

impl Pin {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Pin {
    fn from(value: &str) -> Self {
        Pin(value.to_string())
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(****)")
    }
}

/// Whether a PIN may be stored: 4 to 6 ASCII digits.
pub fn is_well_formed_pin(pin: &str) -> bool {
    (4..=6).contains(&pin.len()) && pin.bytes().all(|b| b.is_ascii_digit())
}

/// Request body for `POST /api/v1/cards/{id}/activate`.
///
/// ```json
/// { "pin": "1234" }
/// ```
#[derive(Debug, Deserialize)]
pub struct ActivateCardRequest {
    pub pin: Pin,
}

/// Request body for `POST /api/v1/cards/{id}/pin`.
///
/// ```json
/// { "old_pin": "1234", "new_pin": "987654" }
/// ```
#[derive(Debug, Deserialize)]
pub struct ChangePinRequest {
    pub old_pin: Pin,
    pub new_pin: Pin,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> Card {
        Card {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            card_type: CardType::Debit,
            withdrawal_limit_cents: 100_000,
            is_activated: true,
            pin_hash: Some("hmac-sha256$00ff$abcdef".into()),
        }
    }

    #[test]
    fn card_type_round_trips_through_text() {
        assert_eq!(CardType::from("CREDIT".to_string()), CardType::Credit);
        assert_eq!(
            CardType::from("PREPAID".to_string()),
            CardType::Other("PREPAID".into())
        );
        assert_eq!(String::from(CardType::Debit), "DEBIT");
    }

    #[test]
    fn serialized_card_never_contains_pin_hash() {
        let json = serde_json::to_value(card()).unwrap();
        assert!(json.get("pin_hash").is_none());
        assert_eq!(json["card_type"], "DEBIT");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let debug = format!("{:?}", card());
        assert!(!debug.contains("abcdef"));

        let pin = Pin::from("1234");
        assert_eq!(format!("{:?}", pin), "Pin(****)");
    }

    #[test]
    fn pin_shape() {
        assert!(is_well_formed_pin("1234"));
        assert!(is_well_formed_pin("123456"));
        assert!(!is_well_formed_pin("123"));
        assert!(!is_well_formed_pin("1234567"));
        assert!(!is_well_formed_pin("12a4"));
    }
}
