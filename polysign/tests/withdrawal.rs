//! Withdrawal flow tests: full success, deferred signing, and both failure
//! shapes of the best-effort cancellation

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use polysign::adapter::ChainAdapter;
use polysign::error::{Error, Result};
use polysign::model::{AuthorityRules, Chain, Fee, TransferRequest, TxParams};
use polysign::offchain::{
    execute_withdrawal, BroadcastWithdrawal, CreateWithdrawal, LedgerClient, WithdrawalOutcome,
    WithdrawalRequest,
};

/// Minimal adapter that signs everything locally without I/O
struct StubAdapter;

#[async_trait]
impl ChainAdapter for StubAdapter {
    fn chain(&self) -> Chain {
        Chain::Matic
    }

    fn authority_rules(&self) -> AuthorityRules {
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
        Ok(serde_json::to_vec(&serde_json::json!({
            "to": request.to,
            "amount": request.amount,
        }))
        .unwrap())
    }

    async fn sign_with_key(&self, _payload: &[u8], _private_key: &str) -> Result<String> {
        Ok("0xsigned".to_string())
    }

    async fn estimate_default_fee(&self, _request: &TransferRequest) -> Result<Fee> {
        Err(Error::UnsupportedOperation("no fee market".to_string()))
    }

    async fn resolve_nonce(&self, _request: &TransferRequest) -> Result<u64> {
        Err(Error::UnsupportedOperation("no nonces".to_string()))
    }

    fn derive_key_from_mnemonic(&self, _mnemonic: &str, index: u32) -> Result<String> {
        Ok(format!("0xderived{}", index))
    }

    async fn broadcast(&self, _signed: &str) -> Result<String> {
        Ok("0xtx".to_string())
    }
}

/// Ledger double with scriptable broadcast/cancel failures
#[derive(Default)]
struct MockLedger {
    fail_broadcast: bool,
    fail_cancel: bool,
    stored: AtomicUsize,
    broadcasts: AtomicUsize,
    cancellations: AtomicUsize,
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn store_withdrawal(&self, _withdrawal: &CreateWithdrawal) -> Result<String> {
        self.stored.fetch_add(1, Ordering::SeqCst);
        Ok("w-17".to_string())
    }

    async fn broadcast_withdrawal(&self, _broadcast: &BroadcastWithdrawal) -> Result<String> {
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        if self.fail_broadcast {
            return Err(Error::Adapter("node rejected transaction".to_string()));
        }
        Ok("0xtx".to_string())
    }

    async fn cancel_withdrawal(&self, _id: &str) -> Result<()> {
        self.cancellations.fetch_add(1, Ordering::SeqCst);
        if self.fail_cancel {
            return Err(Error::Adapter("cancellation rejected".to_string()));
        }
        Ok(())
    }
}

fn withdrawal_request() -> WithdrawalRequest {
    WithdrawalRequest {
        transfer: TransferRequest {
            from_private_key: Some("0xkey".to_string()),
            to: Some("0xrecipient".to_string()),
            amount: Some("3".to_string()),
            ..Default::default()
        },
        sender_account_id: "acc-1".to_string(),
        fee: None,
        attr: None,
    }
}

#[tokio::test]
async fn successful_withdrawal_completes() {
    let ledger = MockLedger::default();
    let outcome = execute_withdrawal(&StubAdapter, &ledger, &withdrawal_request())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        WithdrawalOutcome::Completed {
            id: "w-17".to_string(),
            tx_id: "0xtx".to_string()
        }
    );
    assert_eq!(ledger.stored.load(Ordering::SeqCst), 1);
    assert_eq!(ledger.cancellations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn kms_withdrawal_defers_without_broadcast() {
    let ledger = MockLedger::default();
    let mut request = withdrawal_request();
    let signature_id = Uuid::new_v4();
    request.transfer.from_private_key = None;
    request.transfer.signature_id = Some(signature_id);

    let outcome = execute_withdrawal(&StubAdapter, &ledger, &request)
        .await
        .unwrap();

    match outcome {
        WithdrawalOutcome::Deferred { id, request } => {
            assert_eq!(id, "w-17");
            assert_eq!(request.id, signature_id);
            assert_eq!(request.chain, Chain::Matic);
        }
        other => panic!("expected a deferred outcome, got {:?}", other),
    }
    assert_eq!(ledger.broadcasts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_broadcast_with_clean_cancellation_propagates_error() {
    let ledger = MockLedger {
        fail_broadcast: true,
        ..Default::default()
    };

    let err = execute_withdrawal(&StubAdapter, &ledger, &withdrawal_request())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Adapter(_)));
    assert_eq!(ledger.cancellations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_cancellation_surfaces_partial_outcome() {
    let ledger = MockLedger {
        fail_broadcast: true,
        fail_cancel: true,
        ..Default::default()
    };

    let outcome = execute_withdrawal(&StubAdapter, &ledger, &withdrawal_request())
        .await
        .unwrap();

    match outcome {
        WithdrawalOutcome::RecordedNotCancelled { id, error } => {
            assert_eq!(id, "w-17");
            assert!(error.contains("node rejected transaction"));
            assert!(error.contains("cancellation rejected"));
        }
        other => panic!("expected a partial outcome, got {:?}", other),
    }
}

#[tokio::test]
async fn failed_signing_leaves_nothing_recorded() {
    let ledger = MockLedger::default();
    let mut request = withdrawal_request();
    request.transfer.from_private_key = None;

    let err = execute_withdrawal(&StubAdapter, &ledger, &request)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(ledger.stored.load(Ordering::SeqCst), 0);
}
