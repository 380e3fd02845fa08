//! Account-to-account transfers addressed by IBAN.
//!
//! A transfer writes up to three ledger entries and two balances. Both
//! accounts are locked in id order for the whole operation, and every write
//! goes through one journal so a failure on the destination side also
//! undoes the source side.

use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::{
    account::{is_valid_iban, normalize_iban},
    transaction::{NewTransaction, TransactionType, TransferReceipt},
};
use crate::services::{
    engine::{LedgerEngine, checked_balance, ensure_positive_amount},
    journal::PlannedWrite,
};

impl LedgerEngine {
    /// Move `amount_cents` from `from_account_id` to the account with IBAN
    /// `to_iban`.
    ///
    /// The card must belong to the source account. Transfers between banks
    /// charge the source bank's commission to the source account.
    ///
    /// # Errors
    ///
    /// In order of checking:
    /// - card authentication failures
    /// - `CardAccountMismatch`: card belongs to another account
    /// - `SourceAccountNotFound`
    /// - `InvalidIban`: destination IBAN is malformed
    /// - `DestinationAccountNotFound`: no account has that IBAN
    /// - `InvalidRequest`: destination is the source account
    /// - `InsufficientFunds`
    pub async fn transfer(
        &self,
        card_id: Uuid,
        pin: &str,
        from_account_id: Uuid,
        to_iban: &str,
        amount_cents: i64,
        description: Option<String>,
    ) -> Result<TransferReceipt, LedgerError> {
        ensure_positive_amount(amount_cents)?;
        let card = self.authenticator().authenticate(card_id, pin).await?;

        if card.account_id != from_account_id {
            tracing::warn!(%card_id, %from_account_id, "card used on a foreign account");
            return Err(LedgerError::CardAccountMismatch {
                card_id,
                account_id: from_account_id,
            });
        }

        self.find_account(from_account_id)
            .await?
            .ok_or(LedgerError::SourceAccountNotFound {
                account_id: from_account_id,
            })?;

        let iban = normalize_iban(to_iban);
        if !is_valid_iban(&iban) {
            return Err(LedgerError::InvalidIban(to_iban.to_string()));
        }

        let destination = self
            .find_account_by_iban(&iban)
            .await?
            .ok_or_else(|| LedgerError::DestinationAccountNotFound { iban: iban.clone() })?;

        if destination.id == from_account_id {
            return Err(LedgerError::InvalidRequest(
                "Cannot transfer to the same account".to_string(),
            ));
        }

        let guard = self.locks.lock_all(&[from_account_id, destination.id]).await;

        // Balances read before locking may be stale
        let source = self
            .find_account(from_account_id)
            .await?
            .ok_or(LedgerError::SourceAccountNotFound {
                account_id: from_account_id,
            })?;
        let destination = self
            .find_account(destination.id)
            .await?
            .ok_or(LedgerError::DestinationAccountNotFound { iban })?;

        if source.balance_cents < amount_cents {
            return Err(LedgerError::InsufficientFunds {
                account_id: source.id,
            });
        }

        let commission_cents = if source.bank_id != destination.bank_id {
            self.commission(source.bank_id, amount_cents, &source.currency)
                .await?
        } else {
            0
        };

        let from_new_balance_cents = checked_balance(
            source
                .balance_cents
                .checked_sub(amount_cents)
                .and_then(|b| b.checked_sub(commission_cents)),
        )?;
        let to_new_balance_cents =
            checked_balance(destination.balance_cents.checked_add(amount_cents))?;

        let sent_description = description
            .clone()
            .unwrap_or_else(|| format!("Transfer to {}", destination.iban));
        let received_description =
            description.unwrap_or_else(|| format!("Transfer from {}", source.iban));

        let mut writes = vec![
            PlannedWrite::Append(NewTransaction::new(
                TransactionType::TransferSent,
                &source,
                amount_cents,
                Some(card_id),
                Some(sent_description),
            )),
            PlannedWrite::Append(NewTransaction::new(
                TransactionType::TransferReceived,
                &destination,
                amount_cents,
                None,
                Some(received_description),
            )),
        ];
        if commission_cents > 0 {
            writes.push(PlannedWrite::Append(NewTransaction::new(
                TransactionType::Fee,
                &source,
                commission_cents,
                Some(card_id),
                Some(format!("Commission for transfer to {}", destination.iban)),
            )));
        }
        writes.push(PlannedWrite::set_balance(&source, from_new_balance_cents));
        writes.push(PlannedWrite::set_balance(&destination, to_new_balance_cents));

        self.apply_journaled("transfer", guard, writes).await?;

        tracing::info!(
            %card_id,
            from_account_id = %source.id,
            to_account_id = %destination.id,
            amount_cents,
            commission_cents,
            "transfer completed"
        );

        Ok(TransferReceipt {
            transferred_cents: amount_cents,
            commission_cents,
            from_new_balance_cents,
            to_new_balance_cents,
            currency: source.currency,
        })
    }
}
