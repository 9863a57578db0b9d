//! Bundled chain adapters
//!
//! The EVM family ships here; the Solana adapter lives in the
//! `polysign-solana` member crate to keep its dependency tree out of the core.

pub mod evm;

pub use evm::{EvmAdapter, EvmChainSpec};
