//! Broadcast dispatch
//!
//! Consumes a [`SignedTransactionArtifact`]: raw signed transactions are
//! submitted to the chain, deferred KMS requests are returned untouched for
//! the external signer to pick up.

use tracing::info;

use crate::adapter::ChainAdapter;
use crate::error::Result;
use crate::model::{BroadcastOutcome, SignedTransactionArtifact, TransferRequest};
use crate::resolver;

/// Dispatch a signing artifact.
///
/// Only raw artifacts reach the network; a KMS artifact resolves to
/// [`BroadcastOutcome::Deferred`] without any call.
pub async fn dispatch<A>(
    adapter: &A,
    artifact: &SignedTransactionArtifact,
) -> Result<BroadcastOutcome>
where
    A: ChainAdapter + ?Sized,
{
    match artifact {
        SignedTransactionArtifact::Raw(signed) => {
            let tx_id = adapter.broadcast(signed).await?;
            info!(chain = %adapter.chain(), %tx_id, "transaction broadcast");
            Ok(BroadcastOutcome::Submitted { tx_id })
        }
        SignedTransactionArtifact::Kms(request) => Ok(BroadcastOutcome::Deferred {
            id: request.id,
        }),
    }
}

/// Resolve a transfer request and dispatch the result in one step
pub async fn send_transfer<A>(
    adapter: &A,
    request: &TransferRequest,
) -> Result<BroadcastOutcome>
where
    A: ChainAdapter + ?Sized,
{
    let artifact = resolver::resolve_transfer(adapter, request).await?;
    dispatch(adapter, &artifact).await
}
