//! EVM chain adapter family
//!
//! One adapter covers Ethereum, Harmony, Polygon, and BSC; chain presets
//! carry the chain id and the amount/fee unit handling is shared. Unsigned
//! payloads are serialized as web3-style JSON transaction configs so a
//! deferred payload can be completed and signed by the KMS flow later.

use async_trait::async_trait;
use ethers::abi::token::{LenientTokenizer, Tokenizer};
use ethers::abi::{Function, ParamType, StateMutability, Token};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers_providers::{Http, Middleware, Provider};
use ethers_signers::{LocalWallet, Signer};
use ethers::types::{Address, BlockNumber, Bytes, TransactionRequest as EthersTransactionRequest, U256};
use ethers::utils::{format_units, id, parse_units};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapter::ChainAdapter;
use crate::broadcast;
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::model::{
    AuthorityRules, BroadcastOutcome, Chain, Fee, SignedTransactionArtifact,
    SmartContractInvocation, TransferRequest, TxParams,
};
use crate::resolver;
use crate::wallet;

/// Chain preset: ticker plus mainnet/testnet chain ids
#[derive(Debug, Clone, Copy)]
pub struct EvmChainSpec {
    pub chain: Chain,
    pub mainnet_chain_id: u64,
    pub testnet_chain_id: u64,
}

impl EvmChainSpec {
    /// Ethereum, with Sepolia as testnet
    pub fn ethereum() -> Self {
        Self {
            chain: Chain::Eth,
            mainnet_chain_id: 1,
            testnet_chain_id: 11155111,
        }
    }

    /// Harmony ONE shard 0
    pub fn harmony() -> Self {
        Self {
            chain: Chain::One,
            mainnet_chain_id: 1666600000,
            testnet_chain_id: 1666700000,
        }
    }

    /// Polygon, with Mumbai as testnet
    pub fn polygon() -> Self {
        Self {
            chain: Chain::Matic,
            mainnet_chain_id: 137,
            testnet_chain_id: 80001,
        }
    }

    /// BNB Smart Chain
    pub fn bsc() -> Self {
        Self {
            chain: Chain::Bsc,
            mainnet_chain_id: 56,
            testnet_chain_id: 97,
        }
    }
}

/// Web3-style unsigned transaction config
///
/// `value` and `gas_price` are hex-encoded wei, `gas` a decimal string. A
/// payload prepared for the KMS may leave `gas`/`gas_price`/`nonce` unset;
/// they are completed at signing time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmUnsignedTx {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    pub chain_id: u64,
}

/// Result of a smart-contract invocation
#[derive(Debug, Clone)]
pub enum InvocationOutcome {
    /// Decoded return values of a read-only call
    Data(serde_json::Value),
    /// Broadcast result of a state-changing call
    Transaction(BroadcastOutcome),
}

/// Adapter for EVM-compatible chains
pub struct EvmAdapter {
    spec: EvmChainSpec,
    config: ProviderConfig,
    provider: Provider<Http>,
}

impl EvmAdapter {
    /// Create an adapter for the given chain preset and node configuration
    pub fn new(spec: EvmChainSpec, config: ProviderConfig) -> Result<Self> {
        let provider = Provider::<Http>::try_from(config.endpoint.clone())
            .map_err(|e| Error::Adapter(format!("Failed to create provider: {}", e)))?;

        Ok(Self {
            spec,
            config,
            provider,
        })
    }

    /// The chain id transactions are signed for
    pub fn chain_id(&self) -> u64 {
        if self.config.testnet {
            self.spec.testnet_chain_id
        } else {
            self.spec.mainnet_chain_id
        }
    }

    /// Resolve a native or token transfer into a signing artifact.
    ///
    /// Token transfers with no `digits` read the decimals from the token
    /// contract first; that read is refused for KMS-deferred requests, which
    /// must stay off the network.
    pub async fn prepare_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<SignedTransactionArtifact> {
        let request = self.with_token_decimals(request.clone()).await?;
        resolver::resolve_transfer(self, &request).await
    }

    /// Resolve and broadcast a transfer
    pub async fn send_transfer(&self, request: &TransferRequest) -> Result<BroadcastOutcome> {
        let artifact = self.prepare_transfer(request).await?;
        broadcast::dispatch(self, &artifact).await
    }

    /// Resolve a store-data transaction carrying an arbitrary payload.
    ///
    /// The payload is addressed to `to` when set, otherwise back to the
    /// sender's own address.
    pub async fn prepare_store_data(
        &self,
        request: &TransferRequest,
    ) -> Result<SignedTransactionArtifact> {
        if request.data.is_none() {
            return Err(Error::Validation("data is required".to_string()));
        }
        let mut request = request.clone();
        if request.to.is_none() {
            request.to = request.from.clone();
        }
        if request.to.is_none() {
            return Err(Error::Validation(
                "to or from is required to store data".to_string(),
            ));
        }
        resolver::resolve_transfer(self, &request).await
    }

    /// Invoke a contract method, routing on the ABI fragment: `view`/`pure`
    /// methods run as a read call, anything else is signed and broadcast.
    pub async fn invoke_contract(
        &self,
        invocation: &SmartContractInvocation,
    ) -> Result<InvocationOutcome> {
        let function = parse_function(&invocation.method_abi)?;
        if matches!(
            function.state_mutability,
            StateMutability::View | StateMutability::Pure
        ) {
            let data = self.read_contract(invocation).await?;
            return Ok(InvocationOutcome::Data(data));
        }

        let artifact = self.prepare_contract_invocation(invocation).await?;
        let outcome = broadcast::dispatch(self, &artifact).await?;
        Ok(InvocationOutcome::Transaction(outcome))
    }

    /// Resolve a state-changing contract invocation into a signing artifact
    pub async fn prepare_contract_invocation(
        &self,
        invocation: &SmartContractInvocation,
    ) -> Result<SignedTransactionArtifact> {
        let function = parse_function(&invocation.method_abi)?;
        if matches!(
            function.state_mutability,
            StateMutability::View | StateMutability::Pure
        ) {
            return Err(Error::UnsupportedOperation(format!(
                "method {} is read-only and cannot be signed",
                invocation.method_name
            )));
        }

        let data = encode_call(&function, &invocation.params)?;
        let request = TransferRequest {
            from_private_key: invocation.from_private_key.clone(),
            mnemonic: invocation.mnemonic.clone(),
            signature_id: invocation.signature_id,
            index: invocation.index,
            from: invocation.from.clone(),
            contract_address: Some(invocation.contract_address.clone()),
            amount: invocation.amount.clone(),
            data: Some(format!("0x{}", hex::encode(data))),
            fee: invocation.fee.clone(),
            nonce: invocation.nonce,
            ..Default::default()
        };
        resolver::resolve_transfer(self, &request).await
    }

    /// Execute a read-only contract call and decode its return values
    pub async fn read_contract(
        &self,
        invocation: &SmartContractInvocation,
    ) -> Result<serde_json::Value> {
        let function = parse_function(&invocation.method_abi)?;
        let data = encode_call(&function, &invocation.params)?;

        let to = parse_address(&invocation.contract_address)?;
        let tx = EthersTransactionRequest::new().to(to).data(Bytes::from(data));
        let typed: TypedTransaction = tx.into();
        let output = self
            .provider
            .call(&typed, None)
            .await
            .map_err(Error::adapter)?;

        let tokens = function
            .decode_output(output.as_ref())
            .map_err(|e| Error::Adapter(format!("Failed to decode call output: {}", e)))?;
        Ok(serde_json::Value::Array(
            tokens.iter().map(token_to_json).collect(),
        ))
    }

    /// Read the decimals of an ERC-20 token contract
    pub async fn token_decimals(&self, contract_address: &str) -> Result<u32> {
        let to = parse_address(contract_address)?;
        let data = id("decimals()").to_vec();
        let tx = EthersTransactionRequest::new().to(to).data(Bytes::from(data));
        let typed: TypedTransaction = tx.into();

        let output = self
            .provider
            .call(&typed, None)
            .await
            .map_err(Error::adapter)?;
        if output.is_empty() {
            return Err(Error::Adapter(
                "token contract returned no decimals".to_string(),
            ));
        }
        Ok(U256::from_big_endian(output.as_ref()).as_u32())
    }

    async fn with_token_decimals(&self, mut request: TransferRequest) -> Result<TransferRequest> {
        if request.digits.is_some() || request.data.is_some() {
            return Ok(request);
        }
        if let Some(contract) = request.contract_address.clone() {
            if request.signature_id.is_some() {
                return Err(Error::Validation(
                    "digits are required when deferring a token transfer to KMS".to_string(),
                ));
            }
            let digits = self.token_decimals(&contract).await?;
            debug!(%contract, digits, "read token decimals from chain");
            request.digits = Some(digits);
        }
        Ok(request)
    }

    /// Recipient, value (wei), and call data for a request
    fn tx_essentials(
        &self,
        request: &TransferRequest,
    ) -> Result<(Option<String>, Option<U256>, Option<Vec<u8>>)> {
        if let Some(contract) = &request.contract_address {
            if let Some(data) = &request.data {
                // Prepared contract call: value rides along, data is final
                let value = request.amount.as_deref().map(ether_to_wei).transpose()?;
                return Ok((Some(contract.clone()), value, Some(decode_data(data)?)));
            }

            // ERC-20 transfer
            let to = request
                .to
                .as_deref()
                .ok_or_else(|| Error::Validation("to is required".to_string()))?;
            let amount = request
                .amount
                .as_deref()
                .ok_or_else(|| Error::Validation("amount is required".to_string()))?;
            let digits = request.digits.ok_or_else(|| {
                Error::Validation("token decimals required: supply digits".to_string())
            })?;
            let value = parse_units(amount, digits)
                .map_err(|e| Error::Validation(format!("Invalid amount: {}", e)))?
                .into();
            let data = erc20_transfer_data(parse_address(to)?, value);
            return Ok((Some(contract.clone()), None, Some(data)));
        }

        let value = request.amount.as_deref().map(ether_to_wei).transpose()?;
        let data = request.data.as_deref().map(decode_data).transpose()?;
        Ok((request.to.clone(), value, data))
    }

    /// Assemble a typed transaction for gas estimation and signing
    fn call_skeleton(&self, request: &TransferRequest) -> Result<TypedTransaction> {
        let (to, value, data) = self.tx_essentials(request)?;

        let mut tx = EthersTransactionRequest::new();
        if let Some(to) = to {
            tx = tx.to(parse_address(&to)?);
        }
        if let Some(from) = &request.from {
            tx = tx.from(parse_address(from)?);
        }
        if let Some(value) = value {
            tx = tx.value(value);
        }
        if let Some(data) = data {
            tx = tx.data(Bytes::from(data));
        }
        Ok(tx.into())
    }
}

#[async_trait]
impl ChainAdapter for EvmAdapter {
    fn chain(&self) -> Chain {
        self.spec.chain
    }

    fn authority_rules(&self) -> AuthorityRules {
        // EVM chains track KMS-managed accounts by sender address
        AuthorityRules {
            allow_sender_with_signature_id: true,
        }
    }

    fn build_unsigned_payload(
        &self,
        request: &TransferRequest,
        params: &TxParams,
    ) -> Result<Vec<u8>> {
        let (to, value, data) = self.tx_essentials(request)?;
        let fee = params.fee.clone().unwrap_or_default();
        let gas_price = fee.gas_price.as_deref().map(gwei_to_wei_hex).transpose()?;

        let payload = EvmUnsignedTx {
            from: request.from.clone(),
            to,
            value: value.map(|v| format!("0x{:x}", v)),
            data: data.map(|d| format!("0x{}", hex::encode(d))),
            gas: fee.gas_limit,
            gas_price,
            nonce: params.nonce,
            chain_id: self.chain_id(),
        };

        serde_json::to_vec(&payload).map_err(|e| Error::Serialization(e.to_string()))
    }

    async fn sign_with_key(&self, payload: &[u8], private_key: &str) -> Result<String> {
        let unsigned: EvmUnsignedTx = serde_json::from_slice(payload)
            .map_err(|e| Error::Serialization(format!("Invalid unsigned payload: {}", e)))?;
        let chain_id = unsigned.chain_id;
        let mut typed = to_typed_transaction(unsigned)?;

        // A payload prepared for deferred signing may still miss its fee
        // fields; complete them from the chain before signing.
        if typed.gas().is_none() {
            let gas = self
                .provider
                .estimate_gas(&typed, None)
                .await
                .map_err(Error::adapter)?;
            typed.set_gas(gas);
        }
        if typed.gas_price().map_or(true, |price| price.is_zero()) {
            let price = self.provider.get_gas_price().await.map_err(Error::adapter)?;
            typed.set_gas_price(price);
        }

        let wallet = private_key
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| Error::Signing(format!("Invalid private key: {}", e)))?
            .with_chain_id(chain_id);
        let signature = wallet
            .sign_transaction(&typed)
            .await
            .map_err(|e| Error::Signing(e.to_string()))?;
        let raw = typed.rlp_signed(&signature);
        Ok(format!("0x{}", hex::encode(raw.as_ref())))
    }

    async fn estimate_default_fee(&self, request: &TransferRequest) -> Result<Fee> {
        let typed = self.call_skeleton(request)?;

        let gas = self
            .provider
            .estimate_gas(&typed, None)
            .await
            .map_err(Error::adapter)?;
        let gas_price = self.provider.get_gas_price().await.map_err(Error::adapter)?;
        let gas_price = format_units(gas_price, "gwei")
            .map_err(|e| Error::Adapter(format!("Gas price conversion failed: {}", e)))?;

        Ok(Fee {
            gas_limit: Some(gas.to_string()),
            gas_price: Some(gas_price),
        })
    }

    async fn resolve_nonce(&self, request: &TransferRequest) -> Result<u64> {
        let from = request.from.as_deref().ok_or_else(|| {
            Error::Validation("from address is required to resolve a missing nonce".to_string())
        })?;
        let nonce = self
            .provider
            .get_transaction_count(parse_address(from)?, Some(BlockNumber::Pending.into()))
            .await
            .map_err(Error::adapter)?;
        Ok(nonce.as_u64())
    }

    fn derive_key_from_mnemonic(&self, mnemonic: &str, index: u32) -> Result<String> {
        wallet::private_key_from_mnemonic(self.spec.chain, mnemonic, index, self.config.testnet)
    }

    async fn broadcast(&self, signed: &str) -> Result<String> {
        let bytes = hex::decode(signed.trim_start_matches("0x"))
            .map_err(|e| Error::Validation(format!("Invalid signed transaction: {}", e)))?;
        let pending = self
            .provider
            .send_raw_transaction(Bytes::from(bytes))
            .await
            .map_err(Error::adapter)?;
        Ok(format!("{:?}", pending.tx_hash()))
    }
}

fn parse_address(address: &str) -> Result<Address> {
    address
        .parse::<Address>()
        .map_err(|e| Error::Validation(format!("Invalid address {}: {}", address, e)))
}

fn ether_to_wei(amount: &str) -> Result<U256> {
    Ok(parse_units(amount, "ether")
        .map_err(|e| Error::Validation(format!("Invalid amount: {}", e)))?
        .into())
}

fn gwei_to_wei_hex(gas_price: &str) -> Result<String> {
    let wei: U256 = parse_units(gas_price, "gwei")
        .map_err(|e| Error::Validation(format!("Invalid gas price: {}", e)))?
        .into();
    Ok(format!("0x{:x}", wei))
}

/// Interpret `0x`-prefixed input as hex, anything else as UTF-8 text
fn decode_data(data: &str) -> Result<Vec<u8>> {
    match data.strip_prefix("0x") {
        Some(stripped) => hex::decode(stripped)
            .map_err(|e| Error::Validation(format!("Invalid hex data: {}", e))),
        None => Ok(data.as_bytes().to_vec()),
    }
}

fn erc20_transfer_data(to: Address, value: U256) -> Vec<u8> {
    let mut data = id("transfer(address,uint256)").to_vec();
    data.extend(ethers::abi::encode(&[Token::Address(to), Token::Uint(value)]));
    data
}

fn parse_function(method_abi: &serde_json::Value) -> Result<Function> {
    serde_json::from_value(method_abi.clone())
        .map_err(|e| Error::Validation(format!("Invalid method ABI: {}", e)))
}

fn encode_call(function: &Function, params: &[String]) -> Result<Vec<u8>> {
    if params.len() != function.inputs.len() {
        return Err(Error::Validation(format!(
            "method {} expects {} parameters, got {}",
            function.name,
            function.inputs.len(),
            params.len()
        )));
    }

    let tokens = function
        .inputs
        .iter()
        .zip(params)
        .map(|(input, param)| {
            // The tokenizer wants hex arguments without the 0x prefix
            let arg = match input.kind {
                ParamType::Address | ParamType::Bytes | ParamType::FixedBytes(_) => {
                    param.trim_start_matches("0x")
                }
                _ => param.as_str(),
            };
            LenientTokenizer::tokenize(&input.kind, arg)
                .map_err(|e| Error::Validation(format!("Invalid parameter {}: {}", param, e)))
        })
        .collect::<Result<Vec<Token>>>()?;

    function
        .encode_input(&tokens)
        .map_err(|e| Error::Validation(format!("Failed to encode call: {}", e)))
}

fn to_typed_transaction(unsigned: EvmUnsignedTx) -> Result<TypedTransaction> {
    let mut tx = EthersTransactionRequest::new().chain_id(unsigned.chain_id);
    if let Some(to) = &unsigned.to {
        tx = tx.to(parse_address(to)?);
    }
    if let Some(value) = &unsigned.value {
        tx = tx.value(parse_hex_quantity(value)?);
    }
    if let Some(data) = &unsigned.data {
        tx = tx.data(Bytes::from(decode_data(data)?));
    }
    if let Some(gas) = &unsigned.gas {
        let gas = U256::from_dec_str(gas)
            .map_err(|e| Error::Validation(format!("Invalid gas limit: {}", e)))?;
        tx = tx.gas(gas);
    }
    if let Some(gas_price) = &unsigned.gas_price {
        tx = tx.gas_price(parse_hex_quantity(gas_price)?);
    }
    if let Some(nonce) = unsigned.nonce {
        tx = tx.nonce(nonce);
    }
    Ok(tx.into())
}

fn parse_hex_quantity(value: &str) -> Result<U256> {
    U256::from_str_radix(value.trim_start_matches("0x"), 16)
        .map_err(|e| Error::Validation(format!("Invalid hex quantity {}: {}", value, e)))
}

fn token_to_json(token: &Token) -> serde_json::Value {
    match token {
        Token::Address(address) => serde_json::Value::String(format!("{:?}", address)),
        Token::Uint(value) | Token::Int(value) => serde_json::Value::String(value.to_string()),
        Token::Bool(value) => serde_json::Value::Bool(*value),
        Token::String(value) => serde_json::Value::String(value.clone()),
        Token::Bytes(bytes) | Token::FixedBytes(bytes) => {
            serde_json::Value::String(format!("0x{}", hex::encode(bytes)))
        }
        Token::Array(tokens) | Token::FixedArray(tokens) | Token::Tuple(tokens) => {
            serde_json::Value::Array(tokens.iter().map(token_to_json).collect())
        }
    }
}
