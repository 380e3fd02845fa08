//! In-memory implementation of every store trait.
//!
//! Used by tests and by the service when no `DATABASE_URL` is configured.
//! Contents can be loaded from a JSON seed file:
//!
//! ```json
//! {
//!   "banks":    [{ "id": "...", "name": "First Bank", "commission": "0.01" }],
//!   "atms":     [{ "id": "...", "bank_id": "..." }],
//!   "accounts": [{ "id": "...", "iban": "ES91...", "balance_cents": 50000,
//!                  "currency": "USD", "bank_id": "..." }],
//!   "cards":    [{ "id": "...", "account_id": "...", "card_type": "DEBIT",
//!                  "withdrawal_limit_cents": 100000, "is_activated": true,
//!                  "pin": "1234" }]
//! }
//! ```
//!
//! Seed PINs are hashed on load and never kept in plaintext.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    account::{Account, normalize_iban},
    bank::{Atm, Bank},
    card::{Card, CardType},
    transaction::{NewTransaction, Transaction},
};
use crate::services::card_service::PinHasher;
use crate::store::{AccountStore, AtmStore, BankStore, CardStore, LedgerStore};

#[derive(Default)]
pub struct MemoryStore {
    banks: DashMap<Uuid, Bank>,
    atms: DashMap<Uuid, Atm>,
    accounts: DashMap<Uuid, Account>,
    cards: DashMap<Uuid, Card>,
    /// Entries keyed by id, with their append sequence number
    ledger: DashMap<Uuid, (u64, Transaction)>,
    sequence: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_bank(&self, bank: Bank) {
        self.banks.insert(bank.id, bank);
    }

    pub fn insert_atm(&self, atm: Atm) {
        self.atms.insert(atm.id, atm);
    }

    pub fn insert_account(&self, account: Account) {
        self.accounts.insert(account.id, account);
    }

    pub fn insert_card(&self, card: Card) {
        self.cards.insert(card.id, card);
    }

    #[cfg(test)]
    pub fn account_snapshot(&self, id: Uuid) -> Option<Account> {
        self.accounts.get(&id).map(|a| a.clone())
    }

    /// Load every record of `seed`, hashing card PINs with `hasher`.
    pub fn load_seed(&self, seed: SeedData, hasher: &dyn PinHasher) {
        for bank in seed.banks {
            self.insert_bank(bank);
        }
        for atm in seed.atms {
            self.insert_atm(atm);
        }
        for account in seed.accounts {
            self.insert_account(account);
        }
        for card in seed.cards {
            self.insert_card(Card {
                id: card.id,
                account_id: card.account_id,
                card_type: card.card_type,
                withdrawal_limit_cents: card.withdrawal_limit_cents,
                is_activated: card.is_activated,
                pin_hash: card.pin.as_deref().map(|pin| hasher.hash(pin)),
            });
        }
    }

    /// Read and load a JSON seed file.
    pub fn load_seed_file(&self, path: &Path, hasher: &dyn PinHasher) -> anyhow::Result<()> {
        let raw = std::fs::read_to_string(path)?;
        let seed: SeedData = serde_json::from_str(&raw)?;
        tracing::info!(
            banks = seed.banks.len(),
            atms = seed.atms.len(),
            accounts = seed.accounts.len(),
            cards = seed.cards.len(),
            "Loading seed data from {}",
            path.display()
        );
        self.load_seed(seed, hasher);
        Ok(())
    }
}

/// Seed file contents.
#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub banks: Vec<Bank>,
    #[serde(default)]
    pub atms: Vec<Atm>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub cards: Vec<SeedCard>,
}

/// A card in a seed file, with its PIN in plaintext.
#[derive(Deserialize)]
pub struct SeedCard {
    pub id: Uuid,
    pub account_id: Uuid,
    pub card_type: CardType,
    pub withdrawal_limit_cents: i64,
    #[serde(default)]
    pub is_activated: bool,
    #[serde(default)]
    pub pin: Option<String>,
}

impl std::fmt::Debug for SeedCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedCard")
            .field("id", &self.id)
            .field("account_id", &self.account_id)
            .field("card_type", &self.card_type)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(&id).map(|a| a.clone()))
    }

    async fn get_all(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.accounts.iter().map(|a| a.value().clone()).collect())
    }

    async fn get_by_iban(&self, iban: &str) -> Result<Option<Account>, StoreError> {
        let wanted = normalize_iban(iban);
        Ok(self
            .accounts
            .iter()
            .find(|a| normalize_iban(&a.iban) == wanted)
            .map(|a| a.value().clone()))
    }

    async fn set_balance(&self, id: Uuid, balance_cents: i64) -> Result<Account, StoreError> {
        let mut account = self
            .accounts
            .get_mut(&id)
            .ok_or(StoreError::MissingRecord(id))?;
        account.balance_cents = balance_cents;
        Ok(account.clone())
    }
}

#[async_trait]
impl CardStore for MemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<Card>, StoreError> {
        Ok(self.cards.get(&id).map(|c| c.clone()))
    }

    async fn set_pin_hash(&self, id: Uuid, pin_hash: &str) -> Result<Card, StoreError> {
        let mut card = self.cards.get_mut(&id).ok_or(StoreError::MissingRecord(id))?;
        card.pin_hash = Some(pin_hash.to_string());
        Ok(card.clone())
    }

    async fn set_activated(&self, id: Uuid, activated: bool) -> Result<Card, StoreError> {
        let mut card = self.cards.get_mut(&id).ok_or(StoreError::MissingRecord(id))?;
        card.is_activated = activated;
        Ok(card.clone())
    }
}

#[async_trait]
impl BankStore for MemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<Bank>, StoreError> {
        Ok(self.banks.get(&id).map(|b| b.clone()))
    }
}

#[async_trait]
impl AtmStore for MemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<Atm>, StoreError> {
        Ok(self.atms.get(&id).map(|a| a.clone()))
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn append(&self, entry: NewTransaction) -> Result<Transaction, StoreError> {
        let stored = self.ledger.entry(entry.id).or_insert_with(|| {
            let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
            (seq, entry.into_transaction(Utc::now()))
        });
        Ok(stored.1.clone())
    }

    async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        let mut entries: Vec<(u64, Transaction)> = self
            .ledger
            .iter()
            .filter(|e| e.1.account_id == account_id)
            .map(|e| e.value().clone())
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        Ok(entries.into_iter().map(|(_, t)| t).collect())
    }

    async fn discard(&self, id: Uuid) -> Result<(), StoreError> {
        self.ledger.remove(&id);
        Ok(())
    }
}
