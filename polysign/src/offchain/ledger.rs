//! Hosted ledger API client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::model::Chain;

/// Request to record a withdrawal at the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWithdrawal {
    /// Ledger account the withdrawal debits
    pub sender_account_id: String,
    /// Destination blockchain address
    pub address: String,
    /// Amount in the chain's display denomination
    pub amount: String,
    /// Fee charged to the account, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
    /// Free-form attribute (memo, payment id)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,
}

/// Request to mark a recorded withdrawal as broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastWithdrawal {
    pub tx_data: String,
    pub withdrawal_id: String,
    pub currency: Chain,
}

/// Ledger operations needed by the withdrawal flow
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Record a withdrawal; returns the ledger's withdrawal id
    async fn store_withdrawal(&self, withdrawal: &CreateWithdrawal) -> Result<String>;

    /// Submit a signed transaction through the ledger; returns the tx id
    async fn broadcast_withdrawal(&self, broadcast: &BroadcastWithdrawal) -> Result<String>;

    /// Cancel a recorded withdrawal and revert the account balance
    async fn cancel_withdrawal(&self, id: &str) -> Result<()>;
}

/// HTTP implementation of [`LedgerClient`]
pub struct HttpLedgerClient {
    config: ApiConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct WithdrawalCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WithdrawalBroadcast {
    tx_id: String,
}

impl HttpLedgerClient {
    /// Create a client for the configured service endpoint
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.config.endpoint, path));
        if let Some(api_key) = &self.config.api_key {
            builder = builder.header("x-api-key", api_key);
        }
        builder
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Adapter(format!(
                "ledger call failed with {}: {}",
                status, body
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| Error::Adapter(format!("Failed to parse ledger response: {}", e)))
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn store_withdrawal(&self, withdrawal: &CreateWithdrawal) -> Result<String> {
        let response = self
            .request(reqwest::Method::POST, "/v3/offchain/withdrawal")
            .json(withdrawal)
            .send()
            .await
            .map_err(Error::adapter)?;
        let created: WithdrawalCreated = Self::parse(response).await?;
        Ok(created.id)
    }

    async fn broadcast_withdrawal(&self, broadcast: &BroadcastWithdrawal) -> Result<String> {
        let response = self
            .request(reqwest::Method::POST, "/v3/offchain/withdrawal/broadcast")
            .json(broadcast)
            .send()
            .await
            .map_err(Error::adapter)?;
        let submitted: WithdrawalBroadcast = Self::parse(response).await?;
        Ok(submitted.tx_id)
    }

    async fn cancel_withdrawal(&self, id: &str) -> Result<()> {
        let path = format!("/v3/offchain/withdrawal/{}?revert=true", id);
        let response = self
            .request(reqwest::Method::DELETE, &path)
            .send()
            .await
            .map_err(Error::adapter)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Adapter(format!(
                "withdrawal cancellation failed with {}: {}",
                status, body
            )));
        }
        Ok(())
    }
}
