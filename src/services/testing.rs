//! Test fixtures: an engine over an in-memory store, and a store wrapper
//! that fails chosen writes.

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    account::Account,
    bank::{Atm, Bank},
    card::{Card, CardType},
    transaction::{NewTransaction, Transaction, TransactionType},
};
use crate::services::card_service::{HmacPinHasher, PinHasher};
use crate::services::engine::LedgerEngine;
use crate::store::{
    AccountStore, AtmStore, BankStore, CardStore, LedgerStore, Stores, memory::MemoryStore,
    retry::RetryPolicy,
};

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub engine: Arc<LedgerEngine>,
    next_iban: AtomicU64,
}

fn test_policy() -> RetryPolicy {
    RetryPolicy {
        timeout: Duration::from_secs(1),
        attempts: 2,
        backoff: Duration::from_millis(1),
    }
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let stores = Stores::from_backend(store.clone());
        Self::build(store, stores)
    }

    /// Engine whose stores go through `failing`.
    pub fn with_failing_store(failing: Arc<FailingStore>) -> Self {
        let store = failing.inner.clone();
        let stores = Stores::from_backend(failing);
        Self::build(store, stores)
    }

    fn build(store: Arc<MemoryStore>, stores: Stores) -> Self {
        let engine = LedgerEngine::new(stores, Arc::new(HmacPinHasher), test_policy());
        Self {
            store,
            engine: Arc::new(engine),
            next_iban: AtomicU64::new(1),
        }
    }

    pub fn bank(&self, commission: Option<Decimal>) -> Uuid {
        let id = Uuid::new_v4();
        self.store.insert_bank(Bank {
            id,
            name: format!("Bank {id}"),
            commission,
        });
        id
    }

    pub fn atm(&self, bank_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.store.insert_atm(Atm {
            id,
            bank_id,
            name: None,
        });
        id
    }

    /// USD account with a fresh, well-formed IBAN.
    pub fn account(&self, bank_id: Uuid, balance_cents: i64) -> Account {
        let n = self.next_iban.fetch_add(1, Ordering::SeqCst);
        let account = Account {
            id: Uuid::new_v4(),
            iban: format!("DE89{n:018}"),
            balance_cents,
            currency: "USD".into(),
            bank_id,
        };
        self.store.insert_account(account.clone());
        account
    }

    pub fn card(
        &self,
        account_id: Uuid,
        card_type: CardType,
        withdrawal_limit_cents: i64,
        pin: &str,
        is_activated: bool,
    ) -> Uuid {
        self.insert_card(
            account_id,
            card_type,
            withdrawal_limit_cents,
            Some(HmacPinHasher.hash(pin)),
            is_activated,
        )
    }

    /// Card as issued by the CRUD side: inactive, no PIN yet.
    pub fn card_without_pin(
        &self,
        account_id: Uuid,
        card_type: CardType,
        withdrawal_limit_cents: i64,
    ) -> Uuid {
        self.insert_card(account_id, card_type, withdrawal_limit_cents, None, false)
    }

    fn insert_card(
        &self,
        account_id: Uuid,
        card_type: CardType,
        withdrawal_limit_cents: i64,
        pin_hash: Option<String>,
        is_activated: bool,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.store.insert_card(Card {
            id,
            account_id,
            card_type,
            withdrawal_limit_cents,
            is_activated,
            pin_hash,
        });
        id
    }

    pub fn balance(&self, account_id: Uuid) -> i64 {
        self.store
            .account_snapshot(account_id)
            .unwrap_or_else(|| panic!("account {account_id} exists"))
            .balance_cents
    }

    pub async fn entries(&self, account_id: Uuid) -> Vec<Transaction> {
        self.store.list_by_account(account_id).await.unwrap()
    }

    /// Net balance change recorded in the ledger of `account_id`.
    pub async fn ledger_delta(&self, account_id: Uuid) -> i64 {
        self.entries(account_id)
            .await
            .iter()
            .map(|t| match t.transaction_type {
                TransactionType::Deposit | TransactionType::TransferReceived => t.amount_cents,
                _ => -t.amount_cents,
            })
            .sum()
    }
}

/// Delegates to a `MemoryStore`, failing balance writes on chosen accounts
/// and, on demand, every ledger discard or card activation. Failures are
/// permanent errors, so they are not retried. Balance writes can also be
/// slowed down.
#[derive(Default)]
pub struct FailingStore {
    pub inner: Arc<MemoryStore>,
    /// Balance writes still allowed per account before they start failing.
    balance_budgets: DashMap<Uuid, usize>,
    balance_delay_ms: AtomicU64,
    failing_discards: AtomicBool,
    failing_activations: AtomicBool,
}

impl FailingStore {
    pub fn fail_balance_writes_for(&self, account_id: Uuid) {
        self.fail_balance_writes_after(account_id, 0);
    }

    /// Let `allowed` balance writes on `account_id` through, fail the rest.
    pub fn fail_balance_writes_after(&self, account_id: Uuid, allowed: usize) {
        self.balance_budgets.insert(account_id, allowed);
    }

    pub fn delay_balance_writes(&self, delay: Duration) {
        self.balance_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn fail_discards(&self) {
        self.failing_discards.store(true, Ordering::SeqCst);
    }

    pub fn fail_activations(&self, failing: bool) {
        self.failing_activations.store(failing, Ordering::SeqCst);
    }
}

fn injected(what: &str) -> StoreError {
    StoreError::Database(sqlx::Error::Protocol(format!("injected {what} failure")))
}

#[async_trait]
impl AccountStore for FailingStore {
    async fn get(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        AccountStore::get(&*self.inner, id).await
    }

    async fn get_all(&self) -> Result<Vec<Account>, StoreError> {
        self.inner.get_all().await
    }

    async fn get_by_iban(&self, iban: &str) -> Result<Option<Account>, StoreError> {
        self.inner.get_by_iban(iban).await
    }

    async fn set_balance(&self, id: Uuid, balance_cents: i64) -> Result<Account, StoreError> {
        let delay_ms = self.balance_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        if let Some(mut allowed) = self.balance_budgets.get_mut(&id) {
            if *allowed == 0 {
                return Err(injected("balance write"));
            }
            *allowed -= 1;
        }
        self.inner.set_balance(id, balance_cents).await
    }
}

#[async_trait]
impl CardStore for FailingStore {
    async fn get(&self, id: Uuid) -> Result<Option<Card>, StoreError> {
        CardStore::get(&*self.inner, id).await
    }

    async fn set_pin_hash(&self, id: Uuid, pin_hash: &str) -> Result<Card, StoreError> {
        self.inner.set_pin_hash(id, pin_hash).await
    }

    async fn set_activated(&self, id: Uuid, activated: bool) -> Result<Card, StoreError> {
        if self.failing_activations.load(Ordering::SeqCst) {
            return Err(injected("activation"));
        }
        self.inner.set_activated(id, activated).await
    }
}

#[async_trait]
impl BankStore for FailingStore {
    async fn get(&self, id: Uuid) -> Result<Option<Bank>, StoreError> {
        BankStore::get(&*self.inner, id).await
    }
}

#[async_trait]
impl AtmStore for FailingStore {
    async fn get(&self, id: Uuid) -> Result<Option<Atm>, StoreError> {
        AtmStore::get(&*self.inner, id).await
    }
}

#[async_trait]
impl LedgerStore for FailingStore {
    async fn append(&self, entry: NewTransaction) -> Result<Transaction, StoreError> {
        self.inner.append(entry).await
    }

    async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        self.inner.list_by_account(account_id).await
    }

    async fn discard(&self, id: Uuid) -> Result<(), StoreError> {
        if self.failing_discards.load(Ordering::SeqCst) {
            return Err(injected("discard"));
        }
        self.inner.discard(id).await
    }
}
