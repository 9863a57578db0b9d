//! Resolver dispatch contract tests against a spy adapter

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use polysign::adapter::ChainAdapter;
use polysign::broadcast;
use polysign::error::{Error, Result};
use polysign::kms;
use polysign::model::{
    AuthorityRules, BroadcastOutcome, Chain, Fee, KmsPendingTransaction,
    SignedTransactionArtifact, TransferRequest, TxParams,
};
use polysign::resolver;

/// Spy adapter counting every capability invocation
#[derive(Default)]
struct SpyAdapter {
    default_fee: Fee,
    default_nonce: u64,
    nonce_required: Option<bool>,
    build_calls: AtomicUsize,
    sign_calls: AtomicUsize,
    fee_calls: AtomicUsize,
    nonce_calls: AtomicUsize,
    derive_calls: AtomicUsize,
    broadcast_calls: AtomicUsize,
}

impl SpyAdapter {
    fn with_defaults(fee: Fee, nonce: u64) -> Self {
        Self {
            default_fee: fee,
            default_nonce: nonce,
            ..Default::default()
        }
    }

    fn network_calls(&self) -> usize {
        self.fee_calls.load(Ordering::SeqCst)
            + self.nonce_calls.load(Ordering::SeqCst)
            + self.broadcast_calls.load(Ordering::SeqCst)
    }

    fn total_calls(&self) -> usize {
        self.network_calls()
            + self.build_calls.load(Ordering::SeqCst)
            + self.sign_calls.load(Ordering::SeqCst)
            + self.derive_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainAdapter for SpyAdapter {
    fn chain(&self) -> Chain {
        Chain::Eth
    }

    fn authority_rules(&self) -> AuthorityRules {
        AuthorityRules {
            allow_sender_with_signature_id: true,
        }
    }

    fn requires_nonce(&self) -> bool {
        self.nonce_required.unwrap_or(true)
    }

    fn build_unsigned_payload(
        &self,
        request: &TransferRequest,
        params: &TxParams,
    ) -> Result<Vec<u8>> {
        self.build_calls.fetch_add(1, Ordering::SeqCst);
        let fee = params.fee.clone().unwrap_or_default();
        let payload = serde_json::json!({
            "to": request.to,
            "amount": request.amount,
            "gasLimit": fee.gas_limit,
            "gasPrice": fee.gas_price,
            "nonce": params.nonce,
        });
        Ok(serde_json::to_vec(&payload).unwrap())
    }

    async fn sign_with_key(&self, payload: &[u8], private_key: &str) -> Result<String> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "signed:{}:{}",
            private_key,
            String::from_utf8_lossy(payload)
        ))
    }

    async fn estimate_default_fee(&self, _request: &TransferRequest) -> Result<Fee> {
        self.fee_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.default_fee.clone())
    }

    async fn resolve_nonce(&self, _request: &TransferRequest) -> Result<u64> {
        self.nonce_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.default_nonce)
    }

    fn derive_key_from_mnemonic(&self, mnemonic: &str, index: u32) -> Result<String> {
        self.derive_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("derived:{}:{}", mnemonic.len(), index))
    }

    async fn broadcast(&self, _signed: &str) -> Result<String> {
        self.broadcast_calls.fetch_add(1, Ordering::SeqCst);
        Ok("0xtx".to_string())
    }
}

fn stub_fee() -> Fee {
    Fee {
        gas_limit: Some("21000".to_string()),
        gas_price: Some("20".to_string()),
    }
}

fn raw_key_request() -> TransferRequest {
    TransferRequest {
        from_private_key: Some(format!("0x{}", "4".repeat(64))),
        to: Some("0xabc".to_string()),
        amount: Some("1.5".to_string()),
        ..Default::default()
    }
}

fn payload_of(artifact: &SignedTransactionArtifact) -> serde_json::Value {
    let raw = artifact.as_raw().expect("expected a locally signed artifact");
    let json = raw.splitn(3, ':').nth(2).expect("payload after key");
    serde_json::from_str(json).unwrap()
}

#[tokio::test]
async fn kms_branch_never_signs_or_broadcasts() {
    let adapter = SpyAdapter::with_defaults(stub_fee(), 5);
    let signature_id = Uuid::new_v4();
    let request = TransferRequest {
        signature_id: Some(signature_id),
        to: Some("0xabc".to_string()),
        amount: Some("1".to_string()),
        ..Default::default()
    };

    let artifact = resolver::resolve_transfer(&adapter, &request).await.unwrap();

    match artifact {
        SignedTransactionArtifact::Kms(kms) => {
            assert_eq!(kms.id, signature_id);
            assert_eq!(kms.chain, Chain::Eth);
        }
        SignedTransactionArtifact::Raw(_) => panic!("expected a KMS artifact"),
    }
    assert_eq!(adapter.sign_calls.load(Ordering::SeqCst), 0);
    assert_eq!(adapter.network_calls(), 0);
}

#[tokio::test]
async fn mnemonic_resolution_is_deterministic() {
    let adapter = SpyAdapter::with_defaults(stub_fee(), 5);
    let request = TransferRequest {
        mnemonic: Some("legal winner thank year wave sausage worth useful legal winner thank yellow".to_string()),
        index: Some(2),
        to: Some("0xabc".to_string()),
        amount: Some("1".to_string()),
        nonce: Some(1),
        fee: Some(stub_fee()),
        ..Default::default()
    };

    let first = resolver::resolve_transfer(&adapter, &request).await.unwrap();
    let second = resolver::resolve_transfer(&adapter, &request).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(adapter.derive_calls.load(Ordering::SeqCst), 2);
    assert_eq!(adapter.sign_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn explicit_fee_skips_estimation() {
    let adapter = SpyAdapter::with_defaults(
        Fee {
            gas_limit: Some("999999".to_string()),
            gas_price: Some("999".to_string()),
        },
        5,
    );
    let mut request = raw_key_request();
    request.fee = Some(stub_fee());
    request.nonce = Some(0);

    let artifact = resolver::resolve_transfer(&adapter, &request).await.unwrap();

    assert_eq!(adapter.fee_calls.load(Ordering::SeqCst), 0);
    let payload = payload_of(&artifact);
    assert_eq!(payload["gasLimit"], "21000");
    assert_eq!(payload["gasPrice"], "20");
}

#[tokio::test]
async fn partial_fee_merges_only_missing_fields() {
    let adapter = SpyAdapter::with_defaults(stub_fee(), 5);
    let mut request = raw_key_request();
    request.fee = Some(Fee {
        gas_limit: Some("50000".to_string()),
        gas_price: None,
    });
    request.nonce = Some(0);

    let artifact = resolver::resolve_transfer(&adapter, &request).await.unwrap();

    assert_eq!(adapter.fee_calls.load(Ordering::SeqCst), 1);
    let payload = payload_of(&artifact);
    // Supplied field passes through, missing field is filled with the default
    assert_eq!(payload["gasLimit"], "50000");
    assert_eq!(payload["gasPrice"], "20");
}

#[tokio::test]
async fn missing_nonce_is_resolved_exactly_once() {
    let adapter = SpyAdapter::with_defaults(stub_fee(), 7);
    let mut request = raw_key_request();
    request.fee = Some(stub_fee());

    let artifact = resolver::resolve_transfer(&adapter, &request).await.unwrap();

    assert_eq!(adapter.nonce_calls.load(Ordering::SeqCst), 1);
    assert_eq!(payload_of(&artifact)["nonce"], 7);
}

#[tokio::test]
async fn supplied_nonce_is_never_overwritten() {
    let adapter = SpyAdapter::with_defaults(stub_fee(), 7);
    let mut request = raw_key_request();
    request.fee = Some(stub_fee());
    request.nonce = Some(42);

    let artifact = resolver::resolve_transfer(&adapter, &request).await.unwrap();

    assert_eq!(adapter.nonce_calls.load(Ordering::SeqCst), 0);
    assert_eq!(payload_of(&artifact)["nonce"], 42);
}

#[tokio::test]
async fn nonceless_chains_skip_nonce_resolution() {
    let adapter = SpyAdapter {
        nonce_required: Some(false),
        default_fee: stub_fee(),
        ..Default::default()
    };
    let mut request = raw_key_request();
    request.fee = Some(stub_fee());

    let artifact = resolver::resolve_transfer(&adapter, &request).await.unwrap();

    assert_eq!(adapter.nonce_calls.load(Ordering::SeqCst), 0);
    assert_eq!(payload_of(&artifact)["nonce"], serde_json::Value::Null);
}

#[tokio::test]
async fn missing_signing_material_fails_before_any_adapter_call() {
    let adapter = SpyAdapter::with_defaults(stub_fee(), 5);
    let request = TransferRequest {
        to: Some("0xabc".to_string()),
        amount: Some("1".to_string()),
        ..Default::default()
    };

    let err = resolver::resolve_transfer(&adapter, &request)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(adapter.total_calls(), 0);
}

#[tokio::test]
async fn end_to_end_raw_key_transfer_uses_resolved_values() {
    let adapter = SpyAdapter::with_defaults(stub_fee(), 5);
    let request = raw_key_request();

    let artifact = resolver::resolve_transfer(&adapter, &request).await.unwrap();

    let payload = payload_of(&artifact);
    assert_eq!(payload["to"], "0xabc");
    assert_eq!(payload["amount"], "1.5");
    assert_eq!(payload["gasLimit"], "21000");
    assert_eq!(payload["gasPrice"], "20");
    assert_eq!(payload["nonce"], 5);
    assert_eq!(adapter.fee_calls.load(Ordering::SeqCst), 1);
    assert_eq!(adapter.nonce_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dispatch_submits_raw_and_defers_kms() {
    let adapter = SpyAdapter::with_defaults(stub_fee(), 5);

    let raw = SignedTransactionArtifact::Raw("0xsigned".to_string());
    let outcome = broadcast::dispatch(&adapter, &raw).await.unwrap();
    assert_eq!(
        outcome,
        BroadcastOutcome::Submitted {
            tx_id: "0xtx".to_string()
        }
    );
    assert_eq!(adapter.broadcast_calls.load(Ordering::SeqCst), 1);

    let id = Uuid::new_v4();
    let kms_request = TransferRequest {
        signature_id: Some(id),
        to: Some("0xabc".to_string()),
        amount: Some("1".to_string()),
        ..Default::default()
    };
    let artifact = resolver::resolve_transfer(&adapter, &kms_request).await.unwrap();
    let outcome = broadcast::dispatch(&adapter, &artifact).await.unwrap();
    assert_eq!(outcome, BroadcastOutcome::Deferred { id });
    // No additional broadcast happened for the deferred artifact
    assert_eq!(adapter.broadcast_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn send_transfer_composes_resolution_and_broadcast() {
    let adapter = SpyAdapter::with_defaults(stub_fee(), 5);
    let outcome = broadcast::send_transfer(&adapter, &raw_key_request())
        .await
        .unwrap();

    assert!(matches!(outcome, BroadcastOutcome::Submitted { .. }));
    assert_eq!(adapter.sign_calls.load(Ordering::SeqCst), 1);
    assert_eq!(adapter.broadcast_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pending_kms_transaction_rejects_chain_mismatch() {
    let adapter = SpyAdapter::with_defaults(stub_fee(), 5);
    let pending = KmsPendingTransaction {
        id: "req-1".to_string(),
        chain: Chain::Sol,
        serialized_transaction: "{}".to_string(),
        hashes: vec![],
    };

    let err = kms::sign_pending_transaction(&adapter, &pending, "0xkey")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperation(_)));
    assert_eq!(adapter.sign_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn pending_kms_transaction_signs_on_matching_chain() {
    let adapter = SpyAdapter::with_defaults(stub_fee(), 5);
    let pending = KmsPendingTransaction {
        id: "req-1".to_string(),
        chain: Chain::Eth,
        serialized_transaction: "{\"nonce\":1}".to_string(),
        hashes: vec![],
    };

    let signed = kms::sign_pending_transaction(&adapter, &pending, "0xkey")
        .await
        .unwrap();
    assert_eq!(signed, "signed:0xkey:{\"nonce\":1}");
}
