//! Business logic services.
//!
//! Services contain the ledger engine, separated from HTTP handlers.
//! They authenticate cards, enforce limits, compute commission and keep
//! ledger entries and balances in step.

/// Withdraw and deposit
pub mod atm_service;
/// Card/PIN authentication and PIN management
pub mod card_service;
/// Inter-bank commission
pub mod commission_service;
/// Engine state and read-side operations
pub mod engine;
/// Compensating rollback of partially applied operations
pub mod journal;
/// Per-account mutual exclusion
pub mod locks;
/// Account-to-account transfers
pub mod transfer_service;

#[cfg(test)]
pub(crate) mod testing;
