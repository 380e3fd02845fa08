//! Card authentication and PIN management.
//!
//! This service handles:
//! - Verifying a card/PIN pair before any money moves
//! - First-time PIN setup (activation)
//! - PIN rotation
//!
//! # PIN Storage
//!
//! PINs are stored as `hmac-sha256$<salt hex>$<mac hex>`, where the MAC is
//! HMAC-SHA256 keyed with a random 16-byte salt over the PIN. The hashing
//! scheme sits behind the `PinHasher` trait so the engine never depends on it.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::card::{Card, is_well_formed_pin};
use crate::store::{CardStore, retry::RetryPolicy};

type HmacSha256 = Hmac<Sha256>;

const HMAC_SCHEME: &str = "hmac-sha256";

/// One-way hashing of card PINs.
pub trait PinHasher: Send + Sync {
    /// Produce a salted digest of `pin`.
    fn hash(&self, pin: &str) -> String;

    /// Check `pin` against a digest previously produced by `hash`.
    fn verify(&self, pin: &str, digest: &str) -> bool;
}

/// Salted HMAC-SHA256 PIN hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacPinHasher;

impl PinHasher for HmacPinHasher {
    fn hash(&self, pin: &str) -> String {
        let salt: [u8; 16] = rand::random();
        let mut mac = HmacSha256::new_from_slice(&salt).expect("HMAC key length is valid");
        mac.update(pin.as_bytes());
        format!(
            "{HMAC_SCHEME}${}${}",
            hex::encode(salt),
            hex::encode(mac.finalize().into_bytes())
        )
    }

    fn verify(&self, pin: &str, digest: &str) -> bool {
        let mut parts = digest.split('$');
        let (Some(scheme), Some(salt_hex), Some(mac_hex), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        if scheme != HMAC_SCHEME {
            return false;
        }

        let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(mac_hex)) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&salt) else {
            return false;
        };
        mac.update(pin.as_bytes());

        // Constant-time comparison
        mac.verify_slice(&expected).is_ok()
    }
}

/// Verifies card/PIN pairs and owns PIN changes.
#[derive(Clone)]
pub struct CardAuthenticator {
    cards: Arc<dyn CardStore>,
    hasher: Arc<dyn PinHasher>,
    retry: RetryPolicy,
}

impl CardAuthenticator {
    pub fn new(cards: Arc<dyn CardStore>, hasher: Arc<dyn PinHasher>, retry: RetryPolicy) -> Self {
        Self {
            cards,
            hasher,
            retry,
        }
    }

    /// Authenticate a card with its PIN.
    ///
    /// # Errors
    ///
    /// - `CardNotFound`: no card with this id
    /// - `NotActivated`: card exists but was never activated (PIN not checked)
    /// - `InvalidCredential`: PIN does not match
    pub async fn authenticate(&self, card_id: Uuid, pin: &str) -> Result<Card, LedgerError> {
        let card = self.load(card_id).await?;

        if !card.is_activated {
            tracing::warn!(%card_id, "authentication attempt with inactive card");
            return Err(LedgerError::NotActivated { card_id });
        }

        let verified = card
            .pin_hash
            .as_deref()
            .is_some_and(|digest| self.hasher.verify(pin, digest));
        if !verified {
            tracing::warn!(%card_id, "PIN verification failed");
            return Err(LedgerError::InvalidCredential { card_id });
        }

        Ok(card)
    }

    /// Set the first PIN of a card and activate it.
    ///
    /// No previous PIN is required, so an active card is refused with
    /// `AlreadyActivated`; its PIN only changes through `change_pin`.
    ///
    /// The PIN is stored before the card is switched on. If the second
    /// write fails the card stays inactive and activation can be retried.
    pub async fn activate(&self, card_id: Uuid, pin: &str) -> Result<Card, LedgerError> {
        ensure_storable_pin(pin)?;
        let card = self.load(card_id).await?;
        if card.is_activated {
            tracing::warn!(%card_id, "activation attempt on active card");
            return Err(LedgerError::AlreadyActivated { card_id });
        }

        let hashed = self.hasher.hash(pin);
        let digest = hashed.as_str();
        let cards = &self.cards;
        self.retry
            .call("cards.set_pin_hash", move || cards.set_pin_hash(card_id, digest))
            .await?;
        let card = self
            .retry
            .call("cards.set_activated", move || cards.set_activated(card_id, true))
            .await?;

        tracing::info!(%card_id, "card activated");
        Ok(card)
    }

    /// Replace the PIN of a card after verifying the current one.
    pub async fn change_pin(
        &self,
        card_id: Uuid,
        old_pin: &str,
        new_pin: &str,
    ) -> Result<Card, LedgerError> {
        let card = self.load(card_id).await?;

        let verified = card
            .pin_hash
            .as_deref()
            .is_some_and(|digest| self.hasher.verify(old_pin, digest));
        if !verified {
            tracing::warn!(%card_id, "PIN change rejected: current PIN does not match");
            return Err(LedgerError::InvalidCredential { card_id });
        }
        ensure_storable_pin(new_pin)?;

        let hashed = self.hasher.hash(new_pin);
        let digest = hashed.as_str();
        let cards = &self.cards;
        let card = self
            .retry
            .call("cards.set_pin_hash", move || cards.set_pin_hash(card_id, digest))
            .await?;

        tracing::info!(%card_id, "card PIN changed");
        Ok(card)
    }

    /// Fetch a card or fail with `CardNotFound`.
    pub async fn load(&self, card_id: Uuid) -> Result<Card, LedgerError> {
        let cards = &self.cards;
        self.retry
            .call("cards.get", move || cards.get(card_id))
            .await?
            .ok_or(LedgerError::CardNotFound { card_id })
    }
}

fn ensure_storable_pin(pin: &str) -> Result<(), LedgerError> {
    if is_well_formed_pin(pin) {
        Ok(())
    } else {
        Err(LedgerError::InvalidRequest(
            "PIN must be 4 to 6 digits".to_string(),
        ))
    }
}
