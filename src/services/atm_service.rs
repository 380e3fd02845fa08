//! ATM withdrawals and deposits.
//!
//! Both operations authenticate the card first, so an unauthenticated
//! caller learns nothing beyond "card invalid". The account owning the card
//! stays locked from the first balance read to the last write.

use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::{
    account::Account,
    card::{Card, CardType},
    transaction::{DepositReceipt, NewTransaction, TransactionType, WithdrawalReceipt},
};
use crate::services::{
    engine::{LedgerEngine, checked_balance, ensure_positive_amount},
    journal::PlannedWrite,
};

impl LedgerEngine {
    /// Withdraw `amount_cents` from the account of `card_id` at `atm_id`.
    ///
    /// ATMs of another bank charge the account's bank commission on top of
    /// the amount, recorded as a separate `FEE` entry.
    pub async fn withdraw(
        &self,
        card_id: Uuid,
        atm_id: Uuid,
        pin: &str,
        amount_cents: i64,
    ) -> Result<WithdrawalReceipt, LedgerError> {
        ensure_positive_amount(amount_cents)?;
        let card = self.authenticator().authenticate(card_id, pin).await?;

        let guard = self.locks.lock(card.account_id).await;

        let account = self
            .find_account(card.account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound {
                account_id: card.account_id,
            })?;
        let atm = self
            .find_atm(atm_id)
            .await?
            .ok_or(LedgerError::AtmNotFound { atm_id })?;

        check_withdrawal_limits(&card, &account, amount_cents)?;

        let commission_cents = if atm.bank_id != account.bank_id {
            self.commission(account.bank_id, amount_cents, &account.currency)
                .await?
        } else {
            0
        };

        let new_balance_cents = checked_balance(
            account
                .balance_cents
                .checked_sub(amount_cents)
                .and_then(|b| b.checked_sub(commission_cents)),
        )?;

        let mut writes = vec![PlannedWrite::Append(NewTransaction::new(
            TransactionType::Withdrawal,
            &account,
            amount_cents,
            Some(card_id),
            Some(format!("ATM withdrawal at {atm_id}")),
        ))];
        if commission_cents > 0 {
            writes.push(PlannedWrite::Append(NewTransaction::new(
                TransactionType::Fee,
                &account,
                commission_cents,
                Some(card_id),
                Some(format!("Commission for ATM withdrawal at {atm_id}")),
            )));
        }
        writes.push(PlannedWrite::set_balance(&account, new_balance_cents));

        self.apply_journaled("withdraw", guard, writes).await?;

        tracing::info!(
            %card_id,
            %atm_id,
            account_id = %account.id,
            amount_cents,
            commission_cents,
            new_balance_cents,
            "ATM withdrawal completed"
        );

        Ok(WithdrawalReceipt {
            withdrawn_cents: amount_cents,
            commission_cents,
            new_balance_cents,
            currency: account.currency,
        })
    }

    /// Deposit `amount_cents` into the account of `card_id` at `atm_id`.
    ///
    /// Only ATMs of the account's own bank accept deposits.
    pub async fn deposit(
        &self,
        card_id: Uuid,
        atm_id: Uuid,
        pin: &str,
        amount_cents: i64,
    ) -> Result<DepositReceipt, LedgerError> {
        ensure_positive_amount(amount_cents)?;
        let card = self.authenticator().authenticate(card_id, pin).await?;

        let guard = self.locks.lock(card.account_id).await;

        let account = self
            .find_account(card.account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound {
                account_id: card.account_id,
            })?;
        let atm = self
            .find_atm(atm_id)
            .await?
            .ok_or(LedgerError::AtmNotFound { atm_id })?;

        if atm.bank_id != account.bank_id {
            tracing::warn!(%card_id, %atm_id, account_id = %account.id, "cross-bank deposit rejected");
            return Err(LedgerError::CrossBankDepositNotAllowed {
                atm_id,
                account_id: account.id,
            });
        }

        let new_balance_cents = checked_balance(account.balance_cents.checked_add(amount_cents))?;

        let writes = vec![
            PlannedWrite::Append(NewTransaction::new(
                TransactionType::Deposit,
                &account,
                amount_cents,
                Some(card_id),
                Some(format!("ATM deposit at {atm_id}")),
            )),
            PlannedWrite::set_balance(&account, new_balance_cents),
        ];

        self.apply_journaled("deposit", guard, writes).await?;

        tracing::info!(
            %card_id,
            %atm_id,
            account_id = %account.id,
            amount_cents,
            new_balance_cents,
            "ATM deposit completed"
        );

        Ok(DepositReceipt {
            deposited_cents: amount_cents,
            new_balance_cents,
            currency: account.currency,
        })
    }
}

/// Card-type rules for taking `amount_cents` out of `account`.
///
/// Debit cards need the funds on the account. Credit cards may go negative
/// up to their limit. Either way a single withdrawal never exceeds the card
/// limit.
pub fn check_withdrawal_limits(
    card: &Card,
    account: &Account,
    amount_cents: i64,
) -> Result<(), LedgerError> {
    match &card.card_type {
        CardType::Debit => {
            if account.balance_cents < amount_cents {
                return Err(LedgerError::InsufficientFunds {
                    account_id: account.id,
                });
            }
        }
        CardType::Credit => {
            let available_cents = card
                .withdrawal_limit_cents
                .saturating_sub(account.credit_used_cents());
            if amount_cents > available_cents {
                return Err(LedgerError::CreditLimitExceeded {
                    card_id: card.id,
                    available_cents,
                });
            }
        }
        CardType::Other(card_type) => {
            return Err(LedgerError::UnsupportedCardType {
                card_id: card.id,
                card_type: card_type.clone(),
            });
        }
    }

    if amount_cents > card.withdrawal_limit_cents {
        return Err(LedgerError::LimitExceeded {
            card_id: card.id,
            limit_cents: card.withdrawal_limit_cents,
        });
    }

    Ok(())
}
