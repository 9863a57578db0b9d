//! Signing-authority resolution
//!
//! One generic dispatch routine replaces the per-chain branch-by-field-
//! presence repetition: a request either defers to an external KMS, derives a
//! key from a mnemonic, or signs with a raw private key, in that precedence
//! order. Fee and nonce are resolved lazily; only fields the caller did not
//! supply are fetched from the chain.

use tracing::debug;

use crate::adapter::ChainAdapter;
use crate::error::Result;
use crate::model::{
    Fee, KmsSignatureRequest, SignedTransactionArtifact, SigningAuthority, TransferRequest,
    TxParams,
};

/// Resolve a transfer request into a signed transaction or a deferred KMS
/// signature request.
///
/// Validation runs before any adapter call. The KMS branch is terminal and
/// side-effect free: no signing, no network reads, no broadcast.
pub async fn resolve_transfer<A>(
    adapter: &A,
    request: &TransferRequest,
) -> Result<SignedTransactionArtifact>
where
    A: ChainAdapter + ?Sized,
{
    request.validate()?;
    let authority = SigningAuthority::from_request(request, &adapter.authority_rules())?;

    match authority {
        SigningAuthority::Kms {
            signature_id,
            index,
        } => {
            debug!(chain = %adapter.chain(), %signature_id, "deferring signature to KMS");
            let params = TxParams {
                fee: request.fee.clone(),
                nonce: request.nonce,
                offline: true,
            };
            let payload = adapter.build_unsigned_payload(request, &params)?;
            let kms = KmsSignatureRequest::new(signature_id, adapter.chain(), payload, index)?;
            Ok(SignedTransactionArtifact::Kms(kms))
        }
        SigningAuthority::Mnemonic { mnemonic, index } => {
            debug!(chain = %adapter.chain(), index, "deriving signing key from mnemonic");
            let private_key = adapter.derive_key_from_mnemonic(&mnemonic, index)?;
            sign_locally(adapter, request, &private_key).await
        }
        SigningAuthority::RawKey { private_key } => {
            sign_locally(adapter, request, &private_key).await
        }
    }
}

/// Resolve missing parameters, build the payload, and sign it with the key.
async fn sign_locally<A>(
    adapter: &A,
    request: &TransferRequest,
    private_key: &str,
) -> Result<SignedTransactionArtifact>
where
    A: ChainAdapter + ?Sized,
{
    let fee = if adapter.requires_fee() {
        Some(resolve_fee(adapter, request).await?)
    } else {
        request.fee.clone()
    };

    let nonce = match request.nonce {
        Some(nonce) => Some(nonce),
        None if adapter.requires_nonce() => {
            let nonce = adapter.resolve_nonce(request).await?;
            debug!(chain = %adapter.chain(), nonce, "resolved nonce from chain");
            Some(nonce)
        }
        None => None,
    };

    let params = TxParams {
        fee,
        nonce,
        offline: false,
    };
    let payload = adapter.build_unsigned_payload(request, &params)?;
    let signed = adapter.sign_with_key(&payload, private_key).await?;
    Ok(SignedTransactionArtifact::Raw(signed))
}

/// Fill the fee fields the request did not supply with chain defaults.
///
/// A fully specified fee passes through without an estimation call.
async fn resolve_fee<A>(adapter: &A, request: &TransferRequest) -> Result<Fee>
where
    A: ChainAdapter + ?Sized,
{
    match &request.fee {
        Some(fee) if fee.is_complete() => Ok(fee.clone()),
        supplied => {
            let defaults = adapter.estimate_default_fee(request).await?;
            debug!(chain = %adapter.chain(), ?defaults, "estimated default fee");
            let supplied = supplied.clone().unwrap_or_default();
            Ok(Fee {
                gas_limit: supplied.gas_limit.or(defaults.gas_limit),
                gas_price: supplied.gas_price.or(defaults.gas_price),
            })
        }
    }
}
