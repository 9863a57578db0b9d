//! Out-of-band signing of KMS pending transactions
//!
//! A deferred payload produced by the resolver comes back from the KMS as a
//! [`KmsPendingTransaction`]; the holder of the actual key completes any fee
//! fields the payload was built without and signs it here.

use tracing::debug;

use crate::adapter::ChainAdapter;
use crate::error::{Error, Result};
use crate::model::KmsPendingTransaction;

/// Sign a pending KMS transaction with the supplied private key.
///
/// The pending transaction must belong to the adapter's chain; a mismatch is
/// rejected before anything is parsed or signed.
pub async fn sign_pending_transaction<A>(
    adapter: &A,
    pending: &KmsPendingTransaction,
    private_key: &str,
) -> Result<String>
where
    A: ChainAdapter + ?Sized,
{
    if pending.chain != adapter.chain() {
        return Err(Error::UnsupportedOperation(format!(
            "pending transaction is for {}, adapter serves {}",
            pending.chain,
            adapter.chain()
        )));
    }

    debug!(chain = %pending.chain, id = %pending.id, "signing pending KMS transaction");
    adapter
        .sign_with_key(pending.serialized_transaction.as_bytes(), private_key)
        .await
}
