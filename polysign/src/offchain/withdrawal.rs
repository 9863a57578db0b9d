//! Ledger-recorded withdrawals
//!
//! A withdrawal is signed first, recorded at the ledger, then broadcast. When
//! the broadcast fails the recorded withdrawal is cancelled best-effort; a
//! failed cancellation is not swallowed but surfaced as its own outcome, so
//! callers can reconcile the account manually.

use tracing::{info, warn};

use crate::adapter::ChainAdapter;
use crate::error::{Error, Result};
use crate::model::{KmsSignatureRequest, SignedTransactionArtifact, TransferRequest};
use crate::offchain::ledger::{BroadcastWithdrawal, CreateWithdrawal, LedgerClient};
use crate::resolver;

/// A withdrawal request: the on-chain transfer plus its ledger accounting
#[derive(Debug, Clone)]
pub struct WithdrawalRequest {
    /// The transfer to sign and broadcast
    pub transfer: TransferRequest,
    /// Ledger account the withdrawal debits
    pub sender_account_id: String,
    /// Fee charged to the ledger account
    pub fee: Option<String>,
    /// Free-form attribute (memo, payment id)
    pub attr: Option<String>,
}

/// Terminal states of a withdrawal.
///
/// The partial state is deliberate: a broadcast failure whose compensating
/// cancellation also failed leaves a recorded withdrawal behind, and hiding
/// that behind an error would lose the ledger id needed to clean it up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalOutcome {
    /// Recorded and broadcast
    Completed { id: String, tx_id: String },
    /// Recorded; signing deferred to the KMS
    Deferred {
        id: String,
        request: KmsSignatureRequest,
    },
    /// Recorded, broadcast failed, and the cancellation failed too
    RecordedNotCancelled { id: String, error: String },
}

/// Execute a withdrawal end to end.
///
/// Outcomes: `Ok(Completed)`, `Ok(Deferred)`, `Ok(RecordedNotCancelled)`, or
/// `Err(_)` when nothing was left recorded (signing or recording failed, or
/// the broadcast failed and the withdrawal was cancelled cleanly).
pub async fn execute_withdrawal<A, L>(
    adapter: &A,
    ledger: &L,
    request: &WithdrawalRequest,
) -> Result<WithdrawalOutcome>
where
    A: ChainAdapter + ?Sized,
    L: LedgerClient + ?Sized,
{
    let artifact = resolver::resolve_transfer(adapter, &request.transfer).await?;

    let address = request
        .transfer
        .to
        .clone()
        .ok_or_else(|| Error::Validation("to address is required for a withdrawal".to_string()))?;
    let amount = request
        .transfer
        .amount
        .clone()
        .ok_or_else(|| Error::Validation("amount is required for a withdrawal".to_string()))?;

    let withdrawal = CreateWithdrawal {
        sender_account_id: request.sender_account_id.clone(),
        address,
        amount,
        fee: request.fee.clone(),
        attr: request.attr.clone(),
    };
    let withdrawal_id = ledger.store_withdrawal(&withdrawal).await?;
    info!(%withdrawal_id, chain = %adapter.chain(), "withdrawal recorded");

    let signed = match artifact {
        SignedTransactionArtifact::Kms(kms) => {
            return Ok(WithdrawalOutcome::Deferred {
                id: withdrawal_id,
                request: kms,
            });
        }
        SignedTransactionArtifact::Raw(signed) => signed,
    };

    let broadcast = BroadcastWithdrawal {
        tx_data: signed,
        withdrawal_id: withdrawal_id.clone(),
        currency: adapter.chain(),
    };
    match ledger.broadcast_withdrawal(&broadcast).await {
        Ok(tx_id) => Ok(WithdrawalOutcome::Completed {
            id: withdrawal_id,
            tx_id,
        }),
        Err(broadcast_error) => match ledger.cancel_withdrawal(&withdrawal_id).await {
            Ok(()) => {
                info!(%withdrawal_id, "withdrawal cancelled after failed broadcast");
                Err(broadcast_error)
            }
            Err(cancel_error) => {
                warn!(%withdrawal_id, %cancel_error, "withdrawal cancellation failed");
                Ok(WithdrawalOutcome::RecordedNotCancelled {
                    id: withdrawal_id,
                    error: format!("{}; cancellation failed: {}", broadcast_error, cancel_error),
                })
            }
        },
    }
}
