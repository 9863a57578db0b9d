//! Polysign Core - multi-chain transaction signing SDK
//!
//! This library provides one signing-dispatch contract across multiple
//! blockchains: a transfer request either defers to an external KMS, derives
//! a key from a mnemonic, or signs locally with a raw private key. Chain
//! specifics (payload encoding, fee units, derivation paths, broadcast) live
//! behind the [`adapter::ChainAdapter`] trait; an EVM adapter family is
//! bundled here and a Solana adapter ships in the `polysign-solana` crate.

pub mod adapter;
pub mod broadcast;
pub mod chains;
pub mod config;
pub mod crypto;
pub mod error;
pub mod kms;
pub mod model;
pub mod offchain;
pub mod resolver;
pub mod wallet;

// Re-export commonly used types for convenience
pub use adapter::ChainAdapter;
pub use error::{Error, Result};
pub use model::{
    BroadcastOutcome, Chain, Fee, KmsPendingTransaction, KmsSignatureRequest,
    SignedTransactionArtifact, SigningAuthority, TransferRequest,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
