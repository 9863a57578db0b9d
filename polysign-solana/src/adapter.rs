//! Solana chain adapter
//!
//! Solana has no caller-visible nonce or fee market, so the adapter opts out
//! of both resolver lookups. The unsigned payload is only the transfer
//! description; the recent blockhash is fetched at signing time, which keeps
//! deferred KMS payloads valid however long they wait.

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signer::keypair::{keypair_from_seed, Keypair};
use solana_sdk::signer::Signer;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use tracing::debug;

use polysign::adapter::ChainAdapter;
use polysign::broadcast;
use polysign::config::ProviderConfig;
use polysign::error::{Error, Result};
use polysign::model::{
    AuthorityRules, BroadcastOutcome, Chain, Fee, SignedTransactionArtifact, TransferRequest,
    TxParams,
};
use polysign::{resolver, wallet};

/// Lamports in one SOL
const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Unsigned transfer description serialized for deferred signing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolanaUnsignedTx {
    pub from: String,
    pub to: String,
    pub lamports: u64,
}

/// Adapter for the Solana chain
pub struct SolanaAdapter {
    config: ProviderConfig,
    client: RpcClient,
}

impl SolanaAdapter {
    /// Create an adapter for the configured RPC endpoint
    pub fn new(config: ProviderConfig) -> Self {
        let client = RpcClient::new(config.endpoint.clone());
        Self { config, client }
    }

    /// Resolve a SOL transfer into a signing artifact
    pub async fn prepare_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<SignedTransactionArtifact> {
        resolver::resolve_transfer(self, request).await
    }

    /// Resolve and broadcast a SOL transfer
    pub async fn send_transfer(&self, request: &TransferRequest) -> Result<BroadcastOutcome> {
        broadcast::send_transfer(self, request).await
    }
}

#[async_trait]
impl ChainAdapter for SolanaAdapter {
    fn chain(&self) -> Chain {
        Chain::Sol
    }

    fn authority_rules(&self) -> AuthorityRules {
        // The fee payer address always rides along, KMS or not
        AuthorityRules {
            allow_sender_with_signature_id: true,
        }
    }

    fn requires_nonce(&self) -> bool {
        false
    }

    fn requires_fee(&self) -> bool {
        false
    }

    fn build_unsigned_payload(
        &self,
        request: &TransferRequest,
        _params: &TxParams,
    ) -> Result<Vec<u8>> {
        let from = request
            .from
            .as_deref()
            .ok_or_else(|| Error::Validation("from address is required".to_string()))?;
        let to = request
            .to
            .as_deref()
            .ok_or_else(|| Error::Validation("to address is required".to_string()))?;
        let amount = request
            .amount
            .as_deref()
            .ok_or_else(|| Error::Validation("amount is required".to_string()))?;

        let payload = SolanaUnsignedTx {
            from: from.to_string(),
            to: to.to_string(),
            lamports: lamports_from_sol(amount)?,
        };
        serde_json::to_vec(&payload).map_err(|e| Error::Serialization(e.to_string()))
    }

    async fn sign_with_key(&self, payload: &[u8], private_key: &str) -> Result<String> {
        let unsigned: SolanaUnsignedTx = serde_json::from_slice(payload)
            .map_err(|e| Error::Serialization(format!("Invalid unsigned payload: {}", e)))?;

        let from = parse_pubkey(&unsigned.from)?;
        let to = parse_pubkey(&unsigned.to)?;
        let keypair = keypair_from_hex(private_key)?;
        if keypair.pubkey() != from {
            return Err(Error::Signing(
                "private key does not control the sender address".to_string(),
            ));
        }

        let blockhash = self
            .client
            .get_latest_blockhash()
            .await
            .map_err(Error::adapter)?;
        debug!(%blockhash, "fetched recent blockhash");

        let instruction = system_instruction::transfer(&from, &to, unsigned.lamports);
        let mut transaction = Transaction::new_with_payer(&[instruction], Some(&from));
        transaction
            .try_sign(&[&keypair], blockhash)
            .map_err(|e| Error::Signing(e.to_string()))?;

        let bytes = bincode::serialize(&transaction)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(bs58::encode(bytes).into_string())
    }

    async fn estimate_default_fee(&self, _request: &TransferRequest) -> Result<Fee> {
        Err(Error::UnsupportedOperation(
            "Solana fees are fixed by the network".to_string(),
        ))
    }

    async fn resolve_nonce(&self, _request: &TransferRequest) -> Result<u64> {
        Err(Error::UnsupportedOperation(
            "Solana uses recent blockhashes instead of nonces".to_string(),
        ))
    }

    fn derive_key_from_mnemonic(&self, mnemonic: &str, index: u32) -> Result<String> {
        wallet::private_key_from_mnemonic(Chain::Sol, mnemonic, index, self.config.testnet)
    }

    async fn broadcast(&self, signed: &str) -> Result<String> {
        let bytes = bs58::decode(signed)
            .into_vec()
            .map_err(|e| Error::Validation(format!("Invalid signed transaction: {}", e)))?;
        let transaction: Transaction = bincode::deserialize(&bytes)
            .map_err(|e| Error::Serialization(format!("Invalid signed transaction: {}", e)))?;

        let signature = self
            .client
            .send_transaction(&transaction)
            .await
            .map_err(Error::adapter)?;
        Ok(signature.to_string())
    }
}

/// Parse a SOL amount string into lamports without going through floats
pub fn lamports_from_sol(amount: &str) -> Result<u64> {
    let mut parts = amount.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next().unwrap_or("");

    if whole.is_empty() && fraction.is_empty() {
        return Err(Error::Validation(format!("Invalid amount: {}", amount)));
    }
    if fraction.len() > 9 {
        return Err(Error::Validation(format!(
            "amount {} exceeds lamport precision",
            amount
        )));
    }

    let whole = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u64>()
            .map_err(|e| Error::Validation(format!("Invalid amount {}: {}", amount, e)))?
    };
    let fraction = if fraction.is_empty() {
        0
    } else {
        format!("{:0<9}", fraction)
            .parse::<u64>()
            .map_err(|e| Error::Validation(format!("Invalid amount {}: {}", amount, e)))?
    };

    whole
        .checked_mul(LAMPORTS_PER_SOL)
        .and_then(|lamports| lamports.checked_add(fraction))
        .ok_or_else(|| Error::Validation(format!("amount {} overflows", amount)))
}

fn parse_pubkey(address: &str) -> Result<Pubkey> {
    Pubkey::from_str(address)
        .map_err(|e| Error::Validation(format!("Invalid address {}: {}", address, e)))
}

/// Load a keypair from its hex encoding: either the full 64-byte keypair or
/// the 32-byte secret seed
fn keypair_from_hex(private_key: &str) -> Result<Keypair> {
    let bytes = hex::decode(private_key)
        .map_err(|e| Error::Signing(format!("Invalid private key: {}", e)))?;

    match bytes.len() {
        64 => Keypair::from_bytes(&bytes)
            .map_err(|e| Error::Signing(format!("Invalid keypair: {}", e))),
        32 => keypair_from_seed(&bytes)
            .map_err(|e| Error::Signing(format!("Invalid keypair seed: {}", e))),
        other => Err(Error::Signing(format!(
            "Invalid Solana private key length: {}",
            other
        ))),
    }
}
