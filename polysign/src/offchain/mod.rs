//! Off-chain ledger operations
//!
//! Withdrawals are recorded at the hosted ledger before the signed
//! transaction is broadcast, with best-effort cancellation when the
//! broadcast fails.

pub mod ledger;
pub mod withdrawal;

pub use ledger::{BroadcastWithdrawal, CreateWithdrawal, HttpLedgerClient, LedgerClient};
pub use withdrawal::{execute_withdrawal, WithdrawalOutcome, WithdrawalRequest};
