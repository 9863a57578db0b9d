//! Signing artifacts produced by the resolver

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::request::Chain;

/// Outcome of resolving a transfer request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedTransactionArtifact {
    /// Raw signed transaction, ready to broadcast
    Raw(String),
    /// Deferred signature request, owned by the caller's KMS process
    Kms(KmsSignatureRequest),
}

impl SignedTransactionArtifact {
    /// The raw signed transaction, if signing happened locally
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Self::Raw(signed) => Some(signed),
            Self::Kms(_) => None,
        }
    }
}

/// A signature request handed to an external KMS
///
/// Carries the serialized unsigned payload; the KMS signs with its own
/// custody of keys and re-enters through the broadcast path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KmsSignatureRequest {
    /// The `signature_id` of the originating request
    pub id: Uuid,
    pub chain: Chain,
    pub serialized_transaction: String,
    /// Derivation index of the KMS-tracked account, when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

impl KmsSignatureRequest {
    /// Wrap a serialized unsigned payload produced by a chain adapter
    pub fn new(id: Uuid, chain: Chain, payload: Vec<u8>, index: Option<u32>) -> Result<Self> {
        let serialized_transaction = String::from_utf8(payload)
            .map_err(|e| Error::Serialization(format!("payload is not valid UTF-8: {}", e)))?;
        Ok(Self {
            id,
            chain,
            serialized_transaction,
            index,
        })
    }
}

/// A pending transaction fetched back from the KMS for out-of-band signing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KmsPendingTransaction {
    pub id: String,
    pub chain: Chain,
    pub serialized_transaction: String,
    /// Withdrawal/transaction hashes tracked by the hosted ledger
    #[serde(default)]
    pub hashes: Vec<String>,
}

/// Result of handing an artifact to the broadcast dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BroadcastOutcome {
    /// The signed transaction was submitted to the chain
    Submitted {
        #[serde(rename = "txId")]
        tx_id: String,
    },
    /// Signing is deferred; the id identifies the KMS signature request
    Deferred { id: Uuid },
}
