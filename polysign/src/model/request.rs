//! Transfer and contract-invocation request bodies

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Supported chains, tagged by ticker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Chain {
    /// Ethereum
    Eth,
    /// Harmony
    One,
    /// Polygon
    Matic,
    /// BNB Smart Chain
    Bsc,
    /// Solana
    Sol,
    /// Bitcoin
    Btc,
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ticker = match self {
            Self::Eth => "ETH",
            Self::One => "ONE",
            Self::Matic => "MATIC",
            Self::Bsc => "BSC",
            Self::Sol => "SOL",
            Self::Btc => "BTC",
        };
        write!(f, "{}", ticker)
    }
}

/// Partial fee override
///
/// `gas_price` is denominated in gwei, `gas_limit` in gas units. Fields left
/// empty are filled with chain defaults by the adapter; supplied fields pass
/// through unchanged, even if stale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fee {
    pub gas_limit: Option<String>,
    pub gas_price: Option<String>,
}

impl Fee {
    /// Whether both fields are supplied and no estimation is needed
    pub fn is_complete(&self) -> bool {
        self.gas_limit.is_some() && self.gas_price.is_some()
    }
}

/// A request to move value or invoke a contract method on one blockchain
///
/// Signing material is carried in three optional field groups; exactly one
/// group is consumed, with `signature_id` taking precedence whenever present.
/// See [`SigningAuthority::from_request`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Raw private key, used for local signing
    pub from_private_key: Option<String>,
    /// Mnemonic phrase, combined with `index` to derive a signing key
    pub mnemonic: Option<String>,
    /// Identifier of a key held by an external KMS; defers signing
    pub signature_id: Option<Uuid>,
    /// Derivation index, for both the mnemonic and KMS-tracked accounts
    pub index: Option<u32>,
    /// Sender address; required when a missing nonce must be resolved, and
    /// accepted alongside `signature_id` only where the chain permits it
    pub from: Option<String>,
    /// Recipient address
    pub to: Option<String>,
    /// Token or contract address, for token transfers and invocations
    pub contract_address: Option<String>,
    /// Amount in the chain's display denomination (e.g. ether, SOL)
    pub amount: Option<String>,
    /// Call data or payload to store; `0x`-prefixed hex or plain text
    pub data: Option<String>,
    /// Token decimals; read from the contract when absent and reachable
    pub digits: Option<u32>,
    /// Fee override; missing fields are filled with chain defaults
    pub fee: Option<Fee>,
    /// Transaction nonce; resolved from the chain when absent
    pub nonce: Option<u64>,
}

impl TransferRequest {
    /// Structural validation applied before any adapter call
    pub fn validate(&self) -> Result<()> {
        if self.to.is_none() && self.contract_address.is_none() && self.data.is_none() {
            return Err(Error::Validation(
                "one of to, contractAddress or data must be set".to_string(),
            ));
        }
        if self.contract_address.is_some() && self.amount.is_none() && self.data.is_none() {
            return Err(Error::Validation(
                "amount is required for a token transfer".to_string(),
            ));
        }
        Ok(())
    }
}

/// Chain-configurable rules for which signing-material combinations are legal
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorityRules {
    /// Whether `from` may accompany `signature_id` (KMS-tracked accounts)
    pub allow_sender_with_signature_id: bool,
}

/// The entity responsible for producing a transaction signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningAuthority {
    /// Signing is deferred to an external KMS
    Kms {
        signature_id: Uuid,
        index: Option<u32>,
    },
    /// A key is derived deterministically from a mnemonic and index
    Mnemonic { mnemonic: String, index: u32 },
    /// A raw private key signs locally
    RawKey { private_key: String },
}

impl SigningAuthority {
    /// Extract the signing authority from a request body.
    ///
    /// Precedence is fixed: `signature_id` first, then `mnemonic` + `index`,
    /// then `from_private_key`. A request satisfying none of the branches is
    /// rejected, as is a `from` + `signature_id` combination on chains whose
    /// rules do not allow it.
    pub fn from_request(request: &TransferRequest, rules: &AuthorityRules) -> Result<Self> {
        if let Some(signature_id) = request.signature_id {
            if request.from.is_some() && !rules.allow_sender_with_signature_id {
                return Err(Error::Validation(
                    "from cannot be combined with signatureId on this chain".to_string(),
                ));
            }
            return Ok(Self::Kms {
                signature_id,
                index: request.index,
            });
        }

        if let Some(mnemonic) = &request.mnemonic {
            if let Some(index) = request.index {
                return Ok(Self::Mnemonic {
                    mnemonic: mnemonic.clone(),
                    index,
                });
            }
            if request.from_private_key.is_none() {
                return Err(Error::Validation(
                    "index is required when signing from a mnemonic".to_string(),
                ));
            }
        }

        if let Some(private_key) = &request.from_private_key {
            return Ok(Self::RawKey {
                private_key: private_key.clone(),
            });
        }

        Err(Error::Validation(
            "no signing material: set fromPrivateKey, mnemonic with index, or signatureId"
                .to_string(),
        ))
    }
}

/// Resolved transaction parameters handed to payload construction
///
/// `offline` is set on the KMS path: the adapter must not reach the network
/// and has to fail validation if required metadata was not supplied.
#[derive(Debug, Clone, Default)]
pub struct TxParams {
    pub fee: Option<Fee>,
    pub nonce: Option<u64>,
    pub offline: bool,
}

/// A smart-contract method invocation
///
/// The ABI fragment decides routing: `view`/`pure` methods are executed as a
/// read call without signing, anything else is signed through the resolver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartContractInvocation {
    pub from_private_key: Option<String>,
    pub mnemonic: Option<String>,
    pub signature_id: Option<Uuid>,
    pub index: Option<u32>,
    pub from: Option<String>,
    /// Address of the contract to invoke
    pub contract_address: String,
    /// Method name, e.g. `transferFrom`
    pub method_name: String,
    /// JSON ABI fragment of the method
    pub method_abi: serde_json::Value,
    /// Positional arguments, stringified
    pub params: Vec<String>,
    /// Native value sent along with the call
    pub amount: Option<String>,
    pub fee: Option<Fee>,
    pub nonce: Option<u64>,
}
