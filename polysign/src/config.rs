//! Explicit configuration for chain providers and the hosted ledger API
//!
//! All endpoints and credentials are passed in by the caller; nothing is read
//! from the process environment.

/// Default URL of the hosted ledger/API service
pub const DEFAULT_API_URL: &str = "https://api.polysign.io";

/// Configuration for a chain node provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Node endpoint URL
    pub endpoint: String,
    /// API key, sent as a bearer token when present
    pub api_key: Option<String>,
    /// Whether the adapter targets the chain's testnet
    pub testnet: bool,
    /// Request timeout in seconds
    pub timeout: Option<u64>,
}

impl ProviderConfig {
    /// Create a mainnet configuration for the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            testnet: false,
            timeout: Some(30),
        }
    }

    /// Switch the configuration to testnet
    pub fn testnet(mut self) -> Self {
        self.testnet = true;
        self
    }

    /// Attach an API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Configuration for the hosted ledger API client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Service endpoint URL
    pub endpoint: String,
    /// API key, sent as an `x-api-key` header when present
    pub api_key: Option<String>,
    /// Whether requests target the service's testnet plane
    pub testnet: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_API_URL.to_string(),
            api_key: None,
            testnet: false,
        }
    }
}

impl ApiConfig {
    /// Create a configuration for a custom endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }
}
