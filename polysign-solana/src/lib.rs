//! Solana adapter for Polysign Core
//!
//! Kept out of the core crate so solana-sdk's dependency tree is only paid
//! for by consumers that need it.

mod adapter;

pub use adapter::{lamports_from_sol, SolanaAdapter, SolanaUnsignedTx};
