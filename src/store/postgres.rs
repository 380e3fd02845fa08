//! PostgreSQL implementation of every store trait.
//!
//! # Expected Tables
//!
//! ```text
//! banks        (id UUID PK, name TEXT, commission NUMERIC NULL)
//! atms         (id UUID PK, bank_id UUID, name TEXT NULL)
//! accounts     (id UUID PK, iban TEXT UNIQUE, balance_cents BIGINT,
//!               currency TEXT, bank_id UUID)
//! cards        (id UUID PK, account_id UUID, card_type TEXT,
//!               withdrawal_limit_cents BIGINT, is_activated BOOLEAN,
//!               pin_hash TEXT NULL)
//! transactions (id UUID PK, amount_cents BIGINT, currency TEXT,
//!               transaction_type TEXT, description TEXT NULL,
//!               card_id UUID NULL, account_id UUID, created_at TIMESTAMPTZ)
//! ```

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::StoreError;
use crate::models::{
    account::{Account, normalize_iban},
    bank::{Atm, Bank},
    card::Card,
    transaction::{NewTransaction, Transaction},
};
use crate::store::{AccountStore, AtmStore, BankStore, CardStore, LedgerStore};

const ACCOUNT_COLUMNS: &str = "id, iban, balance_cents, currency, bank_id";
const CARD_COLUMNS: &str =
    "id, account_id, card_type, withdrawal_limit_cents, is_activated, pin_hash";
const TRANSACTION_COLUMNS: &str =
    "id, amount_cents, currency, transaction_type, description, card_id, account_id, created_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn get(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn get_all(&self) -> Result<Vec<Account>, StoreError> {
        let accounts = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY iban"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    async fn get_by_iban(&self, iban: &str) -> Result<Option<Account>, StoreError> {
        // Stored IBANs may contain whitespace, so normalize both sides
        let account = sqlx::query_as::<_, Account>(&format!(
            r"SELECT {ACCOUNT_COLUMNS} FROM accounts
              WHERE regexp_replace(iban, '\s', '', 'g') = $1
              LIMIT 1"
        ))
        .bind(normalize_iban(iban))
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn set_balance(&self, id: Uuid, balance_cents: i64) -> Result<Account, StoreError> {
        sqlx::query_as::<_, Account>(&format!(
            "UPDATE accounts SET balance_cents = $1 WHERE id = $2 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(balance_cents)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::MissingRecord(id))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CardStore for PgStore {
    async fn get(&self, id: Uuid) -> Result<Option<Card>, StoreError> {
        let card = sqlx::query_as::<_, Card>(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    async fn set_pin_hash(&self, id: Uuid, pin_hash: &str) -> Result<Card, StoreError> {
        sqlx::query_as::<_, Card>(&format!(
            "UPDATE cards SET pin_hash = $1 WHERE id = $2 RETURNING {CARD_COLUMNS}"
        ))
        .bind(pin_hash)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::MissingRecord(id))
    }

    async fn set_activated(&self, id: Uuid, activated: bool) -> Result<Card, StoreError> {
        sqlx::query_as::<_, Card>(&format!(
            "UPDATE cards SET is_activated = $1 WHERE id = $2 RETURNING {CARD_COLUMNS}"
        ))
        .bind(activated)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::MissingRecord(id))
    }
}

#[async_trait]
impl BankStore for PgStore {
    async fn get(&self, id: Uuid) -> Result<Option<Bank>, StoreError> {
        let bank =
            sqlx::query_as::<_, Bank>("SELECT id, name, commission FROM banks WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(bank)
    }
}

#[async_trait]
impl AtmStore for PgStore {
    async fn get(&self, id: Uuid) -> Result<Option<Atm>, StoreError> {
        let atm = sqlx::query_as::<_, Atm>("SELECT id, bank_id, name FROM atms WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(atm)
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn append(&self, entry: NewTransaction) -> Result<Transaction, StoreError> {
        // ON CONFLICT keeps a retried append from writing the entry twice
        let inserted = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            INSERT INTO transactions (
                id,
                amount_cents,
                currency,
                transaction_type,
                description,
                card_id,
                account_id,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            ON CONFLICT (id) DO NOTHING
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(entry.id)
        .bind(entry.amount_cents)
        .bind(&entry.currency)
        .bind(entry.transaction_type.as_str())
        .bind(&entry.description)
        .bind(entry.card_id)
        .bind(entry.account_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(transaction) = inserted {
            return Ok(transaction);
        }

        let existing = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(entry.id)
        .fetch_one(&self.pool)
        .await?;

        Ok(existing)
    }

    async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        let transactions = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE account_id = $1 ORDER BY created_at, id"
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    async fn discard(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
