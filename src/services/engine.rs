//! The ledger engine: shared state and read-side operations.
//!
//! The money-moving operations live next to it:
//! - `atm_service`: withdraw and deposit
//! - `transfer_service`: account-to-account transfers
//!
//! Every operation follows the same shape:
//! 1. Validate the request and authenticate the card
//! 2. Lock the accounts involved
//! 3. Re-read them and check business rules (no writes yet)
//! 4. Plan the ledger entries and balance writes
//! 5. Apply them through a `Journal` on a task of their own, which commits
//!    or rolls back every write before the locks are released

use std::sync::Arc;
use uuid::Uuid;

use crate::error::{LedgerError, StoreError};
use crate::models::{
    account::Account,
    bank::Atm,
    card::CardResponse,
    transaction::Transaction,
};
use crate::services::{
    card_service::{CardAuthenticator, PinHasher},
    commission_service::CommissionCalculator,
    journal::{Journal, PlannedWrite},
    locks::{AccountGuard, AccountLocks},
};
use crate::store::{Stores, retry::RetryPolicy};

pub struct LedgerEngine {
    pub(crate) stores: Stores,
    pub(crate) retry: RetryPolicy,
    pub(crate) locks: AccountLocks,
    authenticator: CardAuthenticator,
    commission: CommissionCalculator,
}

impl LedgerEngine {
    pub fn new(stores: Stores, hasher: Arc<dyn PinHasher>, retry: RetryPolicy) -> Self {
        let authenticator = CardAuthenticator::new(stores.cards.clone(), hasher, retry);
        let commission = CommissionCalculator::new(stores.banks.clone(), retry);

        Self {
            stores,
            retry,
            locks: AccountLocks::new(),
            authenticator,
            commission,
        }
    }

    pub fn authenticator(&self) -> &CardAuthenticator {
        &self.authenticator
    }

    pub fn commission_calculator(&self) -> &CommissionCalculator {
        &self.commission
    }

    /// Set the first PIN of a card and activate it.
    pub async fn activate_card(&self, card_id: Uuid, pin: &str) -> Result<CardResponse, LedgerError> {
        let card = self.authenticator.activate(card_id, pin).await?;
        Ok(card.into())
    }

    /// Rotate the PIN of a card.
    pub async fn change_card_pin(
        &self,
        card_id: Uuid,
        old_pin: &str,
        new_pin: &str,
    ) -> Result<CardResponse, LedgerError> {
        let card = self
            .authenticator
            .change_pin(card_id, old_pin, new_pin)
            .await?;
        Ok(card.into())
    }

    pub async fn get_card(&self, card_id: Uuid) -> Result<CardResponse, LedgerError> {
        let card = self.authenticator.load(card_id).await?;
        Ok(card.into())
    }

    pub async fn get_account(&self, account_id: Uuid) -> Result<Account, LedgerError> {
        self.find_account(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound { account_id })
    }

    /// Ledger entries of an account, oldest first.
    pub async fn account_transactions(&self, account_id: Uuid) -> Result<Vec<Transaction>, LedgerError> {
        self.get_account(account_id).await?;

        let ledger = &self.stores.ledger;
        let entries = self
            .retry
            .call("ledger.list_by_account", move || ledger.list_by_account(account_id))
            .await?;

        Ok(entries)
    }

    /// Check that the account store answers.
    pub async fn ping(&self) -> Result<(), LedgerError> {
        let accounts = &self.stores.accounts;
        self.retry.call("accounts.ping", move || accounts.ping()).await?;
        Ok(())
    }

    pub(crate) async fn commission(
        &self,
        bank_id: Uuid,
        amount_cents: i64,
        currency: &str,
    ) -> Result<i64, LedgerError> {
        self.commission.commission(bank_id, amount_cents, currency).await
    }

    pub(crate) async fn find_account(&self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        let accounts = &self.stores.accounts;
        self.retry
            .call("accounts.get", move || accounts.get(account_id))
            .await
    }

    pub(crate) async fn find_account_by_iban(&self, iban: &str) -> Result<Option<Account>, StoreError> {
        let accounts = &self.stores.accounts;
        self.retry
            .call("accounts.get_by_iban", move || accounts.get_by_iban(iban))
            .await
    }

    pub(crate) async fn find_atm(&self, atm_id: Uuid) -> Result<Option<Atm>, StoreError> {
        let atms = &self.stores.atms;
        self.retry.call("atms.get", move || atms.get(atm_id)).await
    }

    /// Apply `writes` as one unit while `guard` keeps the accounts locked.
    ///
    /// The writes run on a spawned task, so dropping the caller (a client
    /// disconnect, a caller-side timeout) cannot stop them between two
    /// writes. The task commits or rolls back and only then unlocks.
    pub(crate) async fn apply_journaled(
        &self,
        operation: &'static str,
        guard: AccountGuard,
        writes: Vec<PlannedWrite>,
    ) -> Result<(), LedgerError> {
        let journal = Journal::new(self.stores.clone(), self.retry, operation);
        let task = tokio::spawn(async move {
            let result = journal.apply(writes).await;
            drop(guard);
            result
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(operation, error = %e, "journaled write task did not finish");
                Err(LedgerError::ConsistencyFault {
                    operation,
                    cause: "write task did not finish".to_string(),
                    rollback: e.to_string(),
                })
            }
        }
    }
}

/// Reject zero and negative amounts.
pub(crate) fn ensure_positive_amount(amount_cents: i64) -> Result<(), LedgerError> {
    if amount_cents <= 0 {
        return Err(LedgerError::InvalidRequest(
            "Amount must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Balance arithmetic that cannot wrap.
pub(crate) fn checked_balance(value: Option<i64>) -> Result<i64, LedgerError> {
    value.ok_or_else(|| LedgerError::InvalidRequest("Amount out of range".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{card::CardType, transaction::TransactionType};
    use crate::services::testing::Fixture;

    #[tokio::test]
    async fn activated_card_view_has_no_pin_material() {
        let fx = Fixture::new();
        let account = fx.account(fx.bank(None), 0);
        let card_id = fx.card_without_pin(account.id, CardType::Debit, 10_000);

        let view = fx.engine.activate_card(card_id, "1234").await.unwrap();
        let json = serde_json::to_string(&view).unwrap();

        assert!(view.is_activated);
        assert!(!json.contains("pin"));
        assert!(!json.contains("hmac"));
    }

    #[tokio::test]
    async fn account_transactions_lists_entries_in_order() {
        let fx = Fixture::new();
        let bank = fx.bank(None);
        let atm = fx.atm(bank);
        let account = fx.account(bank, 10_000);
        let card_id = fx.card(account.id, CardType::Debit, 100_000, "1234", true);

        fx.engine.deposit(card_id, atm, "1234", 2_500).await.unwrap();
        fx.engine.withdraw(card_id, atm, "1234", 1_000).await.unwrap();

        let entries = fx.engine.account_transactions(account.id).await.unwrap();
        let kinds: Vec<_> = entries.iter().map(|t| t.transaction_type).collect();
        assert_eq!(kinds, vec![TransactionType::Deposit, TransactionType::Withdrawal]);
        assert_eq!(entries[0].card_id, Some(card_id));
    }

    #[tokio::test]
    async fn transactions_of_unknown_account_is_not_found() {
        let fx = Fixture::new();
        let result = fx.engine.account_transactions(Uuid::new_v4()).await;
        assert!(matches!(result, Err(LedgerError::AccountNotFound { .. })));
    }

    #[test]
    fn amounts_must_be_positive() {
        assert!(ensure_positive_amount(1).is_ok());
        assert!(matches!(
            ensure_positive_amount(0),
            Err(LedgerError::InvalidRequest(_))
        ));
        assert!(ensure_positive_amount(-5).is_err());
    }
}
