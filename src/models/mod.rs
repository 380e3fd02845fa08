//! Data models for the records the engine reads and writes.
//!
//! Records are owned by the CRUD side of the system; the engine only reads
//! them and mutates balances, card credentials and the ledger.

/// Account record and IBAN helpers
pub mod account;
/// Bank and ATM records
pub mod bank;
/// Card record, card types and PIN wrapper
pub mod card;
/// Minor-unit money helpers
pub mod money;
/// Ledger entries, operation requests and receipts
pub mod transaction;
