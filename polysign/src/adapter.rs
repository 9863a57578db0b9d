//! Chain adapter capability surface
//!
//! Each supported chain implements [`ChainAdapter`]; the resolver is generic
//! over it and never touches chain-specific encoding, units, or derivation
//! paths itself.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{AuthorityRules, Chain, Fee, TransferRequest, TxParams};

/// Chain-specific payload construction, signing, fee/nonce resolution, and
/// broadcast.
///
/// Implementations must be `Send + Sync`; resolutions are independent and
/// stateless, so one adapter instance can serve concurrent calls.
///
/// `build_unsigned_payload` is synchronous and must not perform I/O; all
/// network reads belong in `estimate_default_fee`, `resolve_nonce`,
/// `sign_with_key` and `broadcast`. This keeps the KMS branch free of side
/// effects.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// The chain this adapter serves
    fn chain(&self) -> Chain;

    /// Which signing-material combinations the chain permits
    fn authority_rules(&self) -> AuthorityRules {
        AuthorityRules::default()
    }

    /// Whether transactions on this chain carry a caller-visible nonce
    fn requires_nonce(&self) -> bool {
        true
    }

    /// Whether transactions on this chain carry a caller-visible fee
    fn requires_fee(&self) -> bool {
        true
    }

    /// Serialize the unsigned (or partially prepared) transaction.
    ///
    /// With `params.offline` set the adapter must fail validation rather
    /// than fall back to a network read for missing metadata.
    fn build_unsigned_payload(&self, request: &TransferRequest, params: &TxParams)
        -> Result<Vec<u8>>;

    /// Sign a payload produced by [`Self::build_unsigned_payload`].
    ///
    /// Payloads prepared for deferred signing may still miss fee fields;
    /// implementations fill those from the chain before signing.
    async fn sign_with_key(&self, payload: &[u8], private_key: &str) -> Result<String>;

    /// Chain defaults for the fee fields the request did not supply
    async fn estimate_default_fee(&self, request: &TransferRequest) -> Result<Fee>;

    /// Next usable nonce for the request's sender
    async fn resolve_nonce(&self, request: &TransferRequest) -> Result<u64>;

    /// Deterministically derive a private key from a mnemonic and index
    fn derive_key_from_mnemonic(&self, mnemonic: &str, index: u32) -> Result<String>;

    /// Submit a raw signed transaction; returns the chain's transaction id
    async fn broadcast(&self, signed: &str) -> Result<String>;
}
