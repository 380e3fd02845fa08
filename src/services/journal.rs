//! Compensation log for one engine operation.
//!
//! Ledger appends and balance writes are separate store calls, so an
//! operation can fail halfway. The operation plans its writes up front and
//! hands them to a `Journal`, which applies them in order and remembers how
//! to undo each one. On failure every recorded write is undone, newest
//! first. Writes that could not be undone are reported together in a
//! `ConsistencyFault`.
//!
//! The account locks stay held until the journal has committed or rolled
//! back, so restoring an absolute balance cannot overwrite a concurrent
//! change.

use uuid::Uuid;

use crate::error::{LedgerError, StoreError};
use crate::models::{account::Account, transaction::NewTransaction};
use crate::store::{Stores, retry::RetryPolicy};

/// One store write of an operation, planned before anything is written.
#[derive(Debug, Clone)]
pub enum PlannedWrite {
    Append(NewTransaction),
    /// Overwrite the balance of `account`, which holds the value read
    /// under the lock.
    SetBalance { account: Account, balance_cents: i64 },
}

impl PlannedWrite {
    pub fn set_balance(account: &Account, balance_cents: i64) -> Self {
        Self::SetBalance {
            account: account.clone(),
            balance_cents,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Undo {
    DiscardEntry(Uuid),
    RestoreBalance { account_id: Uuid, previous_cents: i64 },
}

pub struct Journal {
    stores: Stores,
    retry: RetryPolicy,
    operation: &'static str,
    undo: Vec<Undo>,
}

impl Journal {
    pub fn new(stores: Stores, retry: RetryPolicy, operation: &'static str) -> Self {
        Self {
            stores,
            retry,
            operation,
            undo: Vec::new(),
        }
    }

    /// Apply `writes` in order. Either all of them stay in place, or the
    /// ones already made are rolled back and the error is returned.
    pub async fn apply(mut self, writes: Vec<PlannedWrite>) -> Result<(), LedgerError> {
        for write in writes {
            let result = match write {
                PlannedWrite::Append(entry) => self.append(entry).await,
                PlannedWrite::SetBalance {
                    account,
                    balance_cents,
                } => self.set_balance(&account, balance_cents).await,
            };
            if let Err(e) = result {
                return Err(self.rollback(e.into()).await);
            }
        }

        self.commit();
        Ok(())
    }

    async fn append(&mut self, entry: NewTransaction) -> Result<(), StoreError> {
        // Recorded up front: a timed-out append may still have landed, and
        // discarding an id that was never stored is a no-op.
        self.undo.push(Undo::DiscardEntry(entry.id));

        let ledger = &self.stores.ledger;
        self.retry
            .call("ledger.append", move || ledger.append(entry.clone()))
            .await?;
        Ok(())
    }

    async fn set_balance(&mut self, account: &Account, balance_cents: i64) -> Result<(), StoreError> {
        let undo = Undo::RestoreBalance {
            account_id: account.id,
            previous_cents: account.balance_cents,
        };
        let accounts = &self.stores.accounts;
        let account_id = account.id;

        let result = self
            .retry
            .call("accounts.set_balance", move || {
                accounts.set_balance(account_id, balance_cents)
            })
            .await;

        // A permanent failure means the write was rejected and nothing
        // changed. A transient one leaves the outcome unknown.
        match &result {
            Ok(_) => self.undo.push(undo),
            Err(e) if e.is_transient() => self.undo.push(undo),
            Err(_) => {}
        }

        result.map(|_| ())
    }

    fn commit(self) {
        tracing::debug!(
            operation = self.operation,
            writes = self.undo.len(),
            "operation committed"
        );
    }

    /// Undo every recorded write, newest first, and return the error to
    /// report for the operation.
    ///
    /// A failed undo does not stop the others. Returns `cause` when every
    /// undo succeeded, or a `ConsistencyFault` listing each failed undo.
    async fn rollback(self, cause: LedgerError) -> LedgerError {
        tracing::warn!(
            operation = self.operation,
            writes = self.undo.len(),
            error = %cause,
            "rolling back partially applied operation"
        );

        let ledger = &self.stores.ledger;
        let accounts = &self.stores.accounts;
        let mut failures = Vec::new();

        for undo in self.undo.iter().rev().copied() {
            let result = match undo {
                Undo::DiscardEntry(id) => {
                    self.retry
                        .call("ledger.discard", move || ledger.discard(id))
                        .await
                }
                Undo::RestoreBalance {
                    account_id,
                    previous_cents,
                } => self
                    .retry
                    .call("accounts.set_balance", move || {
                        accounts.set_balance(account_id, previous_cents)
                    })
                    .await
                    .map(|_| ()),
            };

            if let Err(rollback_error) = result {
                tracing::error!(
                    operation = self.operation,
                    ?undo,
                    cause = %cause,
                    error = %rollback_error,
                    "undo failed, ledger and balances need manual reconciliation"
                );
                failures.push(format!("{undo:?}: {rollback_error}"));
            }
        }

        if failures.is_empty() {
            return cause;
        }

        LedgerError::ConsistencyFault {
            operation: self.operation,
            cause: cause.to_string(),
            rollback: failures.join("; "),
        }
    }
}
