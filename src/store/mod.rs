//! Record store contracts.
//!
//! Banks, ATMs, accounts, cards and the ledger are owned by the CRUD side of
//! the system. The engine reaches them only through these traits, so the same
//! engine runs against PostgreSQL in production and against memory in tests.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    account::Account,
    bank::{Atm, Bank},
    card::Card,
    transaction::{NewTransaction, Transaction},
};

/// In-memory backend
pub mod memory;
/// PostgreSQL backend
pub mod postgres;
/// Timeouts and retries around store calls
pub mod retry;

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn get_all(&self) -> Result<Vec<Account>, StoreError>;

    /// Look up an account by IBAN, ignoring whitespace on both sides.
    async fn get_by_iban(&self, iban: &str) -> Result<Option<Account>, StoreError>;

    /// Overwrite the cached balance. Fails with `MissingRecord` for unknown ids.
    async fn set_balance(&self, id: Uuid, balance_cents: i64) -> Result<Account, StoreError>;

    /// Connectivity check used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
pub trait CardStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Card>, StoreError>;

    async fn set_pin_hash(&self, id: Uuid, pin_hash: &str) -> Result<Card, StoreError>;

    async fn set_activated(&self, id: Uuid, activated: bool) -> Result<Card, StoreError>;
}

#[async_trait]
pub trait BankStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Bank>, StoreError>;
}

#[async_trait]
pub trait AtmStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Atm>, StoreError>;
}

/// Append-only ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Append an entry. Appending an id that already exists returns the
    /// stored entry unchanged.
    async fn append(&self, entry: NewTransaction) -> Result<Transaction, StoreError>;

    /// Entries of one account, oldest first.
    async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<Transaction>, StoreError>;

    /// Remove an entry written by an operation that is being rolled back.
    ///
    /// Never used on entries of completed operations. Discarding an unknown
    /// id is not an error.
    async fn discard(&self, id: Uuid) -> Result<(), StoreError>;
}

/// The set of collaborators the engine works with.
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub cards: Arc<dyn CardStore>,
    pub banks: Arc<dyn BankStore>,
    pub atms: Arc<dyn AtmStore>,
    pub ledger: Arc<dyn LedgerStore>,
}

impl Stores {
    /// Use one backend for every store.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: AccountStore + CardStore + BankStore + AtmStore + LedgerStore + 'static,
    {
        Self {
            accounts: backend.clone(),
            cards: backend.clone(),
            banks: backend.clone(),
            atms: backend.clone(),
            ledger: backend,
        }
    }
}
